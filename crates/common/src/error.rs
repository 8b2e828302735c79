//! Error types for the Files app harness

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the harness Error
pub type Result<T> = std::result::Result<T, Error>;

/// Harness error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection to the remote application closed")]
    ConnectionClosed,

    #[error("Remote call failed: {class}: {desc}")]
    Remote { class: String, desc: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timeout at {caller} after {attempts} attempt(s) ({elapsed:?}): {last_message}")]
    Timeout {
        caller: String,
        attempts: u32,
        elapsed: Duration,
        last_message: String,
    },

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error came from an exhausted wait
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
