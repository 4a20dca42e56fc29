//! Config commands

use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::ConfigCommands;

pub async fn handle(action: ConfigCommands) -> CliResult<()> {
    match action {
        ConfigCommands::Init => {
            let config = Config::default();
            config.save()?;
            println!("Configuration initialized at ~/.cloudgate/config.toml");
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(None).unwrap_or_default();
            match key.as_str() {
                "api_url" => config.api_url = Some(value),
                "api_key" => config.api_key = Some(value),
                "tenant_id" => config.tenant_id = Some(value),
                "default_format" => config.default_format = Some(value),
                _ => return Err(CliError::Input(format!("unknown config key: {}", key))),
            }
            config.save()?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(None).unwrap_or_default();
            let value = match key.as_str() {
                "api_url" => config.api_url,
                "api_key" => config.api_key.map(|k| mask(&k)),
                "tenant_id" => config.tenant_id,
                "default_format" => config.default_format,
                _ => return Err(CliError::Input(format!("unknown config key: {}", key))),
            };
            println!("{}: {}", key, value.unwrap_or_else(|| "(not set)".into()));
        }
        ConfigCommands::List => {
            let config = Config::load(None).unwrap_or_default();
            println!("api_url: {}", config.api_url.unwrap_or_else(|| "(not set)".into()));
            println!("tenant_id: {}", config.tenant_id.unwrap_or_else(|| "(not set)".into()));
            println!(
                "api_key: {}",
                config
                    .api_key
                    .map(|k| mask(&k))
                    .unwrap_or_else(|| "(not set)".into())
            );
            println!(
                "default_format: {}",
                config.default_format.unwrap_or_else(|| "(not set)".into())
            );
        }
    }
    Ok(())
}

fn mask(key: &str) -> String {
    format!("{}****", &key[..8.min(key.len())])
}
