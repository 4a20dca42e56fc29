//! Devices commands
//!
//! Removal of a user's enrolled devices. The API exposes a soft removal that
//! lets the client re-enroll and a force removal that wipes the enrollment;
//! both answer with a plain status payload the operator wants to see
//! verbatim, so the raw response is printed whatever the status code.

use colored::Colorize;
use serde_json::json;

use super::ApiClient;
use crate::{error::CliResult, DeviceCommands};

pub async fn handle(action: DeviceCommands, client: &ApiClient) -> CliResult<()> {
    match action {
        DeviceCommands::Remove { username, force } => {
            let endpoint = if force {
                "/devices/force-remove"
            } else {
                "/devices/remove"
            };
            tracing::info!("Requesting device removal for '{}' via {}", username, endpoint);

            let (status, body) = client
                .post_raw(endpoint, &json!({ "username": username }))
                .await?;

            let label = if (200..300).contains(&status) {
                format!("{}", status).green().bold()
            } else {
                format!("{}", status).red().bold()
            };
            println!("status: {}", label);

            // Pretty-print when the body is JSON, raw otherwise.
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(value) => {
                    println!("{}", serde_json::to_string_pretty(&value).unwrap_or(body))
                }
                Err(_) => println!("{}", body),
            }
        }
    }
    Ok(())
}
