//! Error types for the Titan deployer

use thiserror::Error;

use crate::session::SessionError;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The session could not be established or was lost mid-sequence.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The script upload failed.
    #[error("Transfer error: {0}")]
    TransferError(String),

    /// The device answered the scheduling command with error text.
    #[error("Scheduler Error: {0}")]
    SchedulingError(String),

    #[error("Invalid transition: {0}")]
    TransitionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployerError {
    /// Classify a transport failure that happened while a command was in flight.
    pub fn from_session(err: SessionError) -> Self {
        match err {
            SessionError::Transfer(msg) => DeployerError::TransferError(msg),
            other => DeployerError::ConnectionError(other.to_string()),
        }
    }
}
