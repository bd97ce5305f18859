//! Lazy, single-flight key binding for encryption contexts.

use std::sync::Arc;

use tracing::{debug, warn};

use sealfield_core::{KeyMaterial, KeyUri};
use sealfield_kms::{KmsClient, KmsTransport, RequestOptions};

use crate::context::EncryptionContext;
use crate::error::{CodecError, Result};

/// Binds exactly one broker key to each [`EncryptionContext`].
pub struct ContextKeyBinder<T: KmsTransport> {
    client: Arc<KmsClient<T>>,
}

impl<T: KmsTransport> ContextKeyBinder<T> {
    pub fn new(client: Arc<KmsClient<T>>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<KmsClient<T>> {
        &self.client
    }

    /// The context's key URL, creating one on first use.
    ///
    /// Concurrent callers on an unbound context queue behind one creation
    /// and all observe its result. A failed creation leaves the context
    /// unbound; the next caller tries again.
    pub async fn ensure_key(&self, context: &EncryptionContext) -> Result<KeyUri> {
        if let Some(uri) = context.encryption_key_url() {
            return Ok(uri);
        }

        let _creation = context.lock_creation().await;
        if let Some(uri) = context.encryption_key_url() {
            return Ok(uri);
        }

        let key = self.create_one().await?;
        debug!(uri = %key.uri, "bound new key to context");
        context.bind(key.uri.clone());
        Ok(key.uri)
    }

    /// Bind a key ahead of first use and resolve its canonical URI.
    ///
    /// Creates the key, then retrieves it so a migrated key is stored under
    /// its final URI. If only the retrieval fails, the created URI is bound,
    /// as [`ensure_key`](Self::ensure_key) would have done. Does nothing
    /// beyond returning the URL when the context is already bound.
    pub async fn prime(&self, context: &EncryptionContext) -> Result<KeyUri> {
        if let Some(uri) = context.encryption_key_url() {
            return Ok(uri);
        }

        let _creation = context.lock_creation().await;
        if let Some(uri) = context.encryption_key_url() {
            return Ok(uri);
        }

        let created = self.create_one().await?;
        let uri = match self
            .client
            .retrieve_key(&created.uri, RequestOptions::default())
            .await
        {
            Ok(resolved) => {
                debug!(created = %created.uri, resolved = %resolved.uri, "primed context key");
                resolved.uri
            }
            Err(err) => {
                warn!(
                    uri = %created.uri,
                    error = %err,
                    "key resolution failed while priming, keeping created key"
                );
                created.uri
            }
        };
        context.bind(uri.clone());
        Ok(uri)
    }

    async fn create_one(&self) -> Result<KeyMaterial> {
        self.client
            .create_unbound_keys(1)
            .await?
            .into_iter()
            .next()
            .ok_or(CodecError::NoUnboundKeys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealfield_core::codes;
    use sealfield_kms::{KmsConfig, KmsResponse, MemoryBroker, WireKey};
    use serde_json::json;

    fn binder(broker: &Arc<MemoryBroker>) -> ContextKeyBinder<Arc<MemoryBroker>> {
        ContextKeyBinder::new(Arc::new(KmsClient::new(
            Arc::clone(broker),
            KmsConfig::default(),
        )))
    }

    #[tokio::test]
    async fn test_bound_context_skips_broker() {
        let broker = MemoryBroker::new("kms");
        let context = EncryptionContext::with_key_url(KeyUri::new("kms://kms/keys/known"));

        let uri = binder(&broker).ensure_key(&context).await.unwrap();
        assert_eq!(uri.as_str(), "kms://kms/keys/known");
        assert_eq!(broker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_key() {
        let broker = MemoryBroker::new("kms");
        let binder = binder(&broker);
        let context = EncryptionContext::new();

        let (a, b, c) = tokio::join!(
            binder.ensure_key(&context),
            binder.ensure_key(&context),
            binder.ensure_key(&context),
        );

        let a = a.unwrap();
        assert_eq!(a, b.unwrap());
        assert_eq!(a, c.unwrap());
        assert_eq!(broker.call_count(), 1);
        assert_eq!(context.encryption_key_url(), Some(a));
    }

    #[tokio::test]
    async fn test_failed_creation_leaves_context_unbound() {
        let broker = MemoryBroker::new("kms");
        broker.push_transport_error("offline");
        let binder = binder(&broker);
        let context = EncryptionContext::new();

        assert!(binder.ensure_key(&context).await.is_err());
        assert!(!context.is_bound());

        let uri = binder.ensure_key(&context).await.unwrap();
        assert_eq!(context.encryption_key_url(), Some(uri));
        assert_eq!(broker.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_key_list_is_an_error() {
        let broker = MemoryBroker::new("kms");
        broker.push_response(KmsResponse::with_status(201));

        let err = binder(&broker)
            .ensure_key(&EncryptionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::NoUnboundKeys));
    }

    #[tokio::test]
    async fn test_prime_keeps_created_key_when_resolution_fails() {
        let broker = MemoryBroker::new("kms");
        broker.push_response(KmsResponse {
            keys: vec![WireKey::new("kms://kms/keys/x", json!({}))],
            ..KmsResponse::with_status(201)
        });
        broker.push_transport_error("blip");

        let binder = binder(&broker);
        let context = EncryptionContext::new();
        let uri = binder.prime(&context).await.unwrap();

        assert_eq!(uri.as_str(), "kms://kms/keys/x");
        assert_eq!(context.encryption_key_url(), Some(uri));
        assert_eq!(broker.call_count(), 2);
    }

    #[tokio::test]
    async fn test_prime_stores_redirected_uri() {
        let broker = MemoryBroker::new("kms");
        broker.push_response(KmsResponse {
            keys: vec![WireKey::new("kms://kms/keys/fresh", json!({}))],
            ..KmsResponse::with_status(201)
        });
        broker.push_response(
            KmsResponse::failure(301, codes::KEY_MIGRATED, "moved")
                .redirect_to("kms://kms/keys/moved"),
        );
        broker.push_response(KmsResponse::with_key(WireKey::new(
            "kms://kms/keys/moved",
            json!({}),
        )));

        let binder = binder(&broker);
        let context = EncryptionContext::new();
        let uri = binder.prime(&context).await.unwrap();

        assert_eq!(uri.as_str(), "kms://kms/keys/moved");
        assert_eq!(context.encryption_key_url(), Some(uri.clone()));
        assert_eq!(broker.call_count(), 3);

        // already bound: the lazy path agrees and makes no calls
        assert_eq!(binder.ensure_key(&context).await.unwrap(), uri);
        assert_eq!(broker.call_count(), 3);
    }
}
