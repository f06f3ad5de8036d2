//! Provisioning error types

use crate::api::ClientError;
use thiserror::Error;

/// Errors raised by cluster operations
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A manager command finished unsuccessfully; carries the remote result message
    #[error("Provisioning error: {0}")]
    Provision(String),

    /// Bad input, e.g. an unsupported process name
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Polling gave up before the condition held
    #[error("Timed out after {seconds}s: {description}")]
    Timeout { description: String, seconds: u64 },

    /// Several concurrent tasks failed
    #[error("{} tasks failed: {}", .0.len(), .0.join("; "))]
    Aggregate(Vec<String>),

    /// A spawned task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Common(#[from] cm_common::Error),
}

impl ProvisionError {
    /// The message carried by a failed manager command, if that is what this is
    pub fn result_message(&self) -> Option<&str> {
        match self {
            ProvisionError::Provision(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            ProvisionError::InvalidArgument(_)
                | ProvisionError::Common(cm_common::Error::InvalidArgument(_))
        )
    }
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;
