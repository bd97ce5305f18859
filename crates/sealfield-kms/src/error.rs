//! Error types for the broker client.

use thiserror::Error;

use sealfield_core::{CoreError, KmsError};

/// Errors that can occur during broker operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required argument was missing. Checked before anything is sent.
    #[error("`{0}` is required")]
    MissingParameter(&'static str),

    /// The broker reported a failure.
    #[error(transparent)]
    Broker(#[from] KmsError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The broker answered with something the client cannot use.
    #[error("invalid broker response: {0}")]
    InvalidResponse(String),

    /// Key data could not be interpreted.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl ClientError {
    /// The broker error, when this failure came from the broker.
    pub fn as_kms_error(&self) -> Option<&KmsError> {
        match self {
            ClientError::Broker(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, ClientError>;
