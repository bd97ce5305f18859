//! Error types for Sealfield Core.

use thiserror::Error;

use crate::types::KeyUri;

/// Broker error codes the client acts on.
pub mod codes {
    /// The key has moved; the reply carries a `redirectUri`.
    pub const KEY_MIGRATED: u32 = 301_002;
}

/// The status block every broker reply carries.
///
/// Implemented by the wire response type so that [`KmsError`] can only be
/// built from something the broker actually sent.
pub trait BrokerReply {
    /// HTTP-like status of the reply.
    fn status(&self) -> u16;

    /// Broker-specific error code, if any.
    fn error_code(&self) -> Option<u32>;

    /// Human-readable reason.
    fn reason(&self) -> Option<&str>;

    /// Request id assigned by the broker.
    fn request_id(&self) -> Option<&str>;

    /// Redirect target for migrated keys.
    fn redirect_uri(&self) -> Option<&str>;
}

/// A normalized broker failure.
///
/// The `Display` output is four lines in a fixed order:
///
/// ```text
/// KmsError: <reason>
/// KMS_RESPONSE_STATUS: <status>
/// KMS_REQUEST_ID: <requestId>
/// KMS_ErrorCode: <errorCode>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("KmsError: {reason}\nKMS_RESPONSE_STATUS: {status}\nKMS_REQUEST_ID: {request_id}\nKMS_ErrorCode: {error_code}")]
pub struct KmsError {
    status: u16,
    error_code: u32,
    reason: String,
    request_id: String,
    redirect_uri: Option<KeyUri>,
}

impl KmsError {
    /// Build from a broker reply. Missing numbers become `0`, missing strings
    /// become empty.
    pub fn from_response<R: BrokerReply + ?Sized>(response: &R) -> Self {
        Self {
            status: response.status(),
            error_code: response.error_code().unwrap_or(0),
            reason: response.reason().unwrap_or_default().to_string(),
            request_id: response.request_id().unwrap_or_default().to_string(),
            redirect_uri: response
                .redirect_uri()
                .filter(|uri| !uri.is_empty())
                .map(KeyUri::new),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn error_code(&self) -> u32 {
        self.error_code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn redirect_uri(&self) -> Option<&KeyUri> {
        self.redirect_uri.as_ref()
    }

    /// Whether the broker reported a key migration.
    pub fn is_key_migrated(&self) -> bool {
        self.error_code == codes::KEY_MIGRATED
    }
}

/// Errors raised while interpreting key data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("key entry has no uri")]
    MissingKeyUri,

    #[error("malformed key material: {0}")]
    MalformedKey(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
