//! Encrypt and decrypt records field by field.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use sealfield_core::KeyRef;
use sealfield_kms::KmsTransport;

use crate::binder::ContextKeyBinder;
use crate::context::EncryptionContext;
use crate::crypto::CryptoProvider;
use crate::error::{CodecError, Result};
use crate::fields::{Encryptable, FieldSpec};

#[derive(Debug, Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Applies a [`FieldSpec`] to records using one crypto provider.
///
/// All crypto calls for one record run concurrently. When some of them fail
/// the successful ones are still written back, and the first failure in
/// field order is returned. Values are never rolled back, so a failed record
/// may hold a mix of ciphertext and plaintext.
pub struct FieldCodec<T: KmsTransport, C: CryptoProvider> {
    binder: ContextKeyBinder<T>,
    crypto: Arc<C>,
}

impl<T: KmsTransport, C: CryptoProvider> FieldCodec<T, C> {
    pub fn new(binder: ContextKeyBinder<T>, crypto: Arc<C>) -> Self {
        Self { binder, crypto }
    }

    pub fn binder(&self) -> &ContextKeyBinder<T> {
        &self.binder
    }

    pub fn crypto(&self) -> &Arc<C> {
        &self.crypto
    }

    /// Encrypt a record's fields under its context's key.
    ///
    /// Binds a key to the context first if it has none, and stamps the key
    /// URL on the record.
    pub async fn encrypt<R: Encryptable>(
        &self,
        record: &mut R,
        context: &EncryptionContext,
    ) -> Result<()> {
        self.encrypt_with(record, context, &R::field_spec()).await
    }

    /// [`encrypt`](Self::encrypt) with an explicit field list.
    pub async fn encrypt_with<R: Encryptable>(
        &self,
        record: &mut R,
        context: &EncryptionContext,
        spec: &FieldSpec<R>,
    ) -> Result<()> {
        let uri = self.binder.ensure_key(context).await?;
        record.set_encryption_key_url(uri.clone());
        self.apply(record, spec, &KeyRef::Uri(uri), Direction::Encrypt)
            .await
    }

    /// Encrypt several records sharing one context.
    ///
    /// The context is bound once up front; records are then processed
    /// concurrently.
    pub async fn encrypt_many<R: Encryptable>(
        &self,
        records: &mut [R],
        context: &EncryptionContext,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.binder.ensure_key(context).await?;

        let spec = R::field_spec();
        let results = join_all(
            records
                .iter_mut()
                .map(|record| self.encrypt_with(record, context, &spec)),
        )
        .await;
        first_error(results)
    }

    /// Decrypt a record in place using its own key URL.
    ///
    /// A missing record, or one without a key URL, is left untouched.
    pub async fn decrypt<R: Encryptable>(&self, record: Option<&mut R>) -> Result<()> {
        match record {
            Some(record) => self.decrypt_with(record, &R::field_spec()).await,
            None => Ok(()),
        }
    }

    /// [`decrypt`](Self::decrypt) with an explicit field list.
    pub async fn decrypt_with<R: Encryptable>(
        &self,
        record: &mut R,
        spec: &FieldSpec<R>,
    ) -> Result<()> {
        let Some(uri) = record
            .encryption_key_url()
            .filter(|uri| !uri.is_empty())
            .cloned()
        else {
            return Ok(());
        };
        self.apply(record, spec, &KeyRef::Uri(uri), Direction::Decrypt)
            .await
    }

    /// Decrypt every record in a list, concurrently.
    pub async fn decrypt_many<R: Encryptable>(&self, records: Option<&mut [R]>) -> Result<()> {
        let Some(records) = records else {
            return Ok(());
        };

        let spec = R::field_spec();
        let results = join_all(
            records
                .iter_mut()
                .map(|record| self.decrypt_with(record, &spec)),
        )
        .await;
        first_error(results)
    }

    async fn apply<R>(
        &self,
        record: &mut R,
        spec: &FieldSpec<R>,
        key: &KeyRef,
        direction: Direction,
    ) -> Result<()> {
        let pending = spec.pending(record);
        if pending.is_empty() {
            return Ok(());
        }

        let crypto = &self.crypto;
        let outcomes = join_all(pending.iter().map(|item| async move {
            match direction {
                Direction::Encrypt => crypto.encrypt_text(key, &item.value).await,
                Direction::Decrypt => crypto.decrypt_text(key, &item.value).await,
            }
        }))
        .await;

        let total = pending.len();
        let mut done = Vec::with_capacity(total);
        let mut failure = None;
        for (item, outcome) in pending.into_iter().zip(outcomes) {
            match outcome {
                Ok(value) => done.push((item, value)),
                Err(source) => {
                    warn!(field = item.field, ?direction, error = %source, "field crypto failed");
                    if failure.is_none() {
                        failure = Some(CodecError::Crypto {
                            field: item.field,
                            source,
                        });
                    }
                }
            }
        }

        debug!(?direction, fields = total, written = done.len(), "applied field spec");
        spec.write_back(record, done);
        failure.map_or(Ok(()), Err)
    }
}

fn first_error(results: Vec<Result<()>>) -> Result<()> {
    results.into_iter().find_map(|result| result.err()).map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use crate::fields::Field;
    use async_trait::async_trait;
    use sealfield_core::KeyUri;
    use sealfield_kms::{KmsClient, KmsConfig, MemoryBroker};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps values as `enc(<key>|<value>)`; values containing "boom" fail.
    #[derive(Default)]
    struct TagCrypto {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CryptoProvider for TagCrypto {
        async fn encrypt_text(
            &self,
            key: &KeyRef,
            plaintext: &str,
        ) -> std::result::Result<String, CryptoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if plaintext.contains("boom") {
                return Err(CryptoError::Encrypt("refused".into()));
            }
            Ok(format!("enc({}|{})", key.uri(), plaintext))
        }

        async fn decrypt_text(
            &self,
            key: &KeyRef,
            ciphertext: &str,
        ) -> std::result::Result<String, CryptoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let prefix = format!("enc({}|", key.uri());
            ciphertext
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(')'))
                .map(str::to_string)
                .ok_or_else(|| CryptoError::InvalidCiphertext(ciphertext.to_string()))
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Memo {
        key_url: Option<KeyUri>,
        subject: Option<String>,
        body: Option<String>,
        parts: Vec<String>,
    }

    fn subject(memo: &mut Memo) -> Option<&mut String> {
        memo.subject.as_mut()
    }

    fn body(memo: &mut Memo) -> Option<&mut String> {
        memo.body.as_mut()
    }

    fn parts(memo: &mut Memo) -> Vec<&mut String> {
        memo.parts.iter_mut().collect()
    }

    impl Encryptable for Memo {
        fn field_spec() -> FieldSpec<Self> {
            FieldSpec::new(vec![
                Field::scalar("subject", subject),
                Field::scalar("body", body),
                Field::each("parts[]", parts),
            ])
        }

        fn encryption_key_url(&self) -> Option<&KeyUri> {
            self.key_url.as_ref()
        }

        fn set_encryption_key_url(&mut self, uri: KeyUri) {
            self.key_url = Some(uri);
        }
    }

    fn codec() -> (Arc<MemoryBroker>, FieldCodec<Arc<MemoryBroker>, TagCrypto>) {
        let broker = MemoryBroker::new("kms");
        let client = Arc::new(KmsClient::new(Arc::clone(&broker), KmsConfig::default()));
        let codec = FieldCodec::new(ContextKeyBinder::new(client), Arc::new(TagCrypto::default()));
        (broker, codec)
    }

    fn memo() -> Memo {
        Memo {
            key_url: None,
            subject: Some("hello".into()),
            body: Some("world".into()),
            parts: vec!["p1".into(), "p2".into()],
        }
    }

    #[tokio::test]
    async fn test_encrypt_then_decrypt() {
        let (broker, codec) = codec();
        let context = EncryptionContext::new();
        let mut record = memo();

        codec.encrypt(&mut record, &context).await.unwrap();

        let uri = context.encryption_key_url().unwrap();
        assert_eq!(record.key_url.as_ref(), Some(&uri));
        assert_eq!(record.subject, Some(format!("enc({uri}|hello)")));
        assert_eq!(record.parts[1], format!("enc({uri}|p2)"));
        assert_eq!(broker.calls_to("/keys").len(), 1);

        codec.decrypt(Some(&mut record)).await.unwrap();
        assert_eq!(record, Memo { key_url: Some(uri), ..memo() });
    }

    #[tokio::test]
    async fn test_empty_and_absent_fields_untouched() {
        let (_, codec) = codec();
        let context = EncryptionContext::new();
        let mut record = Memo {
            subject: Some(String::new()),
            body: None,
            ..Memo::default()
        };

        codec.encrypt(&mut record, &context).await.unwrap();

        assert_eq!(record.subject.as_deref(), Some(""));
        assert_eq!(record.body, None);
        assert!(record.key_url.is_some());
        assert_eq!(codec.crypto().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successes() {
        let (_, codec) = codec();
        let context = EncryptionContext::new();
        let mut record = Memo {
            body: Some("boom".into()),
            ..memo()
        };

        let err = codec.encrypt(&mut record, &context).await.unwrap_err();
        assert!(matches!(err, CodecError::Crypto { field: "body", .. }));

        let uri = context.encryption_key_url().unwrap();
        assert_eq!(record.subject, Some(format!("enc({uri}|hello)")));
        assert_eq!(record.body.as_deref(), Some("boom"));
        assert_eq!(record.parts[0], format!("enc({uri}|p1)"));
    }

    #[tokio::test]
    async fn test_first_error_in_field_order() {
        let (_, codec) = codec();
        let mut record = Memo {
            body: Some("boom body".into()),
            parts: vec!["boom part".into()],
            ..memo()
        };

        let err = codec
            .encrypt(&mut record, &EncryptionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::Crypto { field: "body", .. }));
    }

    #[tokio::test]
    async fn test_decrypt_noops() {
        let (broker, codec) = codec();

        codec.decrypt::<Memo>(None).await.unwrap();
        codec.decrypt_many::<Memo>(None).await.unwrap();

        let mut unkeyed = memo();
        codec.decrypt(Some(&mut unkeyed)).await.unwrap();
        assert_eq!(unkeyed, memo());

        let mut blank = Memo {
            key_url: Some(KeyUri::new("")),
            ..memo()
        };
        codec.decrypt(Some(&mut blank)).await.unwrap();
        assert_eq!(blank.subject.as_deref(), Some("hello"));

        assert_eq!(broker.call_count(), 0);
        assert_eq!(codec.crypto().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_many_share_one_key() {
        let (broker, codec) = codec();
        let context = EncryptionContext::new();
        let mut records = vec![memo(), memo(), memo()];

        codec.encrypt_many(&mut records, &context).await.unwrap();

        let uri = context.encryption_key_url().unwrap();
        assert!(records.iter().all(|r| r.key_url.as_ref() == Some(&uri)));
        assert_eq!(broker.call_count(), 1);

        codec.decrypt_many(Some(&mut records[..])).await.unwrap();
        assert!(records.iter().all(|r| r.subject.as_deref() == Some("hello")));
    }

    #[tokio::test]
    async fn test_binding_failure_leaves_record_alone() {
        let (broker, codec) = codec();
        broker.push_transport_error("offline");
        let context = EncryptionContext::new();
        let mut record = memo();

        let err = codec.encrypt(&mut record, &context).await.unwrap_err();
        assert!(matches!(err, CodecError::Client(_)));
        assert_eq!(record, memo());
        assert!(!context.is_bound());
    }
}
