//! Per-resource encryption context.

use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};

use sealfield_core::KeyUri;

/// The one key URL used for every encrypted field of one resource.
///
/// Owned by a single feature-level object (a task draft, an assistant
/// exchange). Starts empty and is bound the first time anything under it is
/// encrypted. Never rotated or cleared.
pub struct EncryptionContext {
    key_url: RwLock<Option<KeyUri>>,
    /// Held while a key is being created for this context.
    creation: Mutex<()>,
}

impl EncryptionContext {
    /// An unbound context.
    pub fn new() -> Self {
        Self {
            key_url: RwLock::new(None),
            creation: Mutex::new(()),
        }
    }

    /// A context for a resource that already has a key. An empty URI leaves
    /// the context unbound.
    pub fn with_key_url(uri: KeyUri) -> Self {
        let context = Self::new();
        if !uri.is_empty() {
            *context.key_url.write() = Some(uri);
        }
        context
    }

    /// The bound key URL, if any.
    pub fn encryption_key_url(&self) -> Option<KeyUri> {
        self.key_url.read().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.key_url.read().is_some()
    }

    pub(crate) fn bind(&self, uri: KeyUri) {
        *self.key_url.write() = Some(uri);
    }

    pub(crate) async fn lock_creation(&self) -> MutexGuard<'_, ()> {
        self.creation.lock().await
    }
}

impl Default for EncryptionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("encryption_key_url", &*self.key_url.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_unbound() {
        let context = EncryptionContext::new();
        assert!(!context.is_bound());
        assert_eq!(context.encryption_key_url(), None);
    }

    #[test]
    fn test_with_key_url() {
        let context = EncryptionContext::with_key_url(KeyUri::new("kms://a/keys/1"));
        assert_eq!(
            context.encryption_key_url(),
            Some(KeyUri::new("kms://a/keys/1"))
        );

        let empty = EncryptionContext::with_key_url(KeyUri::new(""));
        assert!(!empty.is_bound());
    }
}
