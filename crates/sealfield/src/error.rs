//! Error types for the encryption service.

use sealfield_codec::{CodecError, CryptoError};
use sealfield_kms::ClientError;
use thiserror::Error;

/// Errors that can occur during service operations.
///
/// Both variants are transparent so a broker failure still renders as the
/// four-line `KmsError` text.
#[derive(Debug, Error)]
pub enum SealfieldError {
    /// Broker client error.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Field codec error.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl SealfieldError {
    /// The broker error behind this failure, if there is one.
    pub fn as_kms_error(&self) -> Option<&sealfield_core::KmsError> {
        match self {
            SealfieldError::Client(err) => err.as_kms_error(),
            SealfieldError::Codec(CodecError::Client(err)) => err.as_kms_error(),
            SealfieldError::Codec(CodecError::Crypto {
                source: CryptoError::Kms(err),
                ..
            }) => err.as_kms_error(),
            SealfieldError::Codec(_) => None,
        }
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, SealfieldError>;
