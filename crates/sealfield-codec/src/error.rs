//! Error types for the field codec.

use thiserror::Error;

use sealfield_kms::ClientError;

/// Failures reported by a crypto primitive.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key could not be resolved through the broker.
    #[error("key resolution failed: {0}")]
    Kms(#[from] ClientError),

    /// The key material cannot be turned into a cipher key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Encryption error.
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Decryption error.
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// The ciphertext is not in the expected format.
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),
}

/// Errors that can occur while encrypting or decrypting records.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Broker failure while binding or resolving a key.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A field's crypto call failed.
    #[error("crypto failure on field `{field}`: {source}")]
    Crypto {
        field: &'static str,
        source: CryptoError,
    },

    /// The broker answered a key creation with an empty list.
    #[error("broker returned no unbound keys")]
    NoUnboundKeys,
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
