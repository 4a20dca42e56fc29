//! Error types for the CloudGate CLI

use thiserror::Error;

/// CloudGate CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    /// The API answered with a non-success status
    #[error("API request to {endpoint} failed with status {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected shape
    #[error("unexpected response from {endpoint}: {detail}")]
    Response { endpoint: String, detail: String },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Invalid operator input
    #[error("invalid input: {0}")]
    Input(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for the CloudGate CLI
pub type CliResult<T> = Result<T, CliError>;
