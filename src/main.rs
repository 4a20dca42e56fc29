//! CloudGate CLI
//!
//! Command-line interface for administering a CloudGate tenant.
//!
//! # Usage
//!
//! ```bash
//! cloudgate categories list
//! cloudgate categories usage --outfile usage-report.csv
//! cloudgate categories add-urls CUSTOM_01 --file urls.txt
//! cloudgate policies custom-refs
//! cloudgate devices remove jdoe --force
//! cloudgate segments export --outfile segments.csv
//! cloudgate segments import --csv segments.csv
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;
mod reconcile;

#[derive(Parser)]
#[command(name = "cloudgate")]
#[command(version = "0.1.0")]
#[command(about = "CloudGate tenant administration CLI", long_about = None)]
struct Cli {
    /// API endpoint URL
    #[arg(long, env = "CLOUDGATE_API_URL")]
    api_url: Option<String>,

    /// API key for authentication
    #[arg(long, env = "CLOUDGATE_API_KEY")]
    api_key: Option<String>,

    /// Tenant ID
    #[arg(long, env = "CLOUDGATE_TENANT_ID")]
    tenant_id: Option<String>,

    /// Output format
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage URL categories
    Categories {
        #[command(subcommand)]
        action: CategoryCommands,
    },
    /// Inspect URL filtering policies
    Policies {
        #[command(subcommand)]
        action: PolicyCommands,
    },
    /// Manage enrolled devices
    Devices {
        #[command(subcommand)]
        action: DeviceCommands,
    },
    /// Manage application segments
    Segments {
        #[command(subcommand)]
        action: SegmentCommands,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List custom URL categories with their URL counts
    List,
    /// Get category details
    Get { id: String },
    /// Report which custom categories are used by filtering policies
    Usage {
        /// Also write a CSV report to this path
        #[arg(long)]
        outfile: Option<PathBuf>,
    },
    /// Merge URLs from a text file into a category
    AddUrls {
        id: String,
        /// File with one URL per line
        #[arg(long)]
        file: PathBuf,
    },
    /// Merge URLs from a change CSV (URL and TicketID columns) into a category
    Update {
        id: String,
        /// Change CSV file
        #[arg(long)]
        csv: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// List URL filtering policies
    List,
    /// Get policy details
    Get { id: String },
    /// List policies referencing custom categories
    CustomRefs,
}

#[derive(Subcommand)]
pub enum DeviceCommands {
    /// Remove a user's enrolled devices
    Remove {
        username: String,
        /// Force removal; the device cannot re-enroll on its own
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum SegmentCommands {
    /// Export application segments to CSV
    Export {
        #[arg(long, default_value = "segments-export.csv")]
        outfile: PathBuf,
    },
    /// Create application segments from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Create even when a segment with the same name already exists
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = config::Config::load(cli.profile.as_deref()).unwrap_or_default();
    let api_url = cli
        .api_url
        .or(config.api_url)
        .unwrap_or_else(|| "https://api.cloudgate.io/v1".to_string());
    let api_key = cli.api_key.or(config.api_key);
    let tenant_id = cli.tenant_id.or(config.tenant_id);
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(|f| output::OutputFormat::from_str(f, true).ok())
        })
        .unwrap_or(output::OutputFormat::Table);

    if api_key.is_none() && !matches!(cli.command, Commands::Config { .. }) {
        tracing::warn!(
            "No API key configured; set CLOUDGATE_API_KEY or run 'cloudgate config set api_key <key>'"
        );
    }

    let client = commands::ApiClient::new(&api_url, api_key.as_deref(), tenant_id.as_deref());

    let result = match cli.command {
        Commands::Categories { action } => {
            commands::categories::handle(action, &client, format).await
        }
        Commands::Policies { action } => commands::policies::handle(action, &client, format).await,
        Commands::Devices { action } => commands::devices::handle(action, &client).await,
        Commands::Segments { action } => commands::segments::handle(action, &client).await,
        Commands::Config { action } => commands::config::handle(action).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
