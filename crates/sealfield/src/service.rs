//! The encryption service: one broker client, one codec, and the named
//! operations each feature calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sealfield_codec::{
    ContextKeyBinder, CryptoProvider, Encryptable, EncryptionContext, FieldCodec,
    LocalCryptoProvider,
};
use sealfield_core::KeyUri;
use sealfield_kms::{KmsClient, KmsConfig, KmsTransport};

use crate::error::Result;
use crate::features::{Activity, AssistantRequest, AssistantResponse, Task, TaskRequest};

/// Configuration for the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Broker client configuration.
    pub kms: KmsConfig,
    /// Create and resolve a key as soon as a context is opened, instead of
    /// on first encryption.
    pub prime_contexts: bool,
}

/// Field-level encryption for application records.
///
/// Provides:
/// - Encryption contexts, one per resource
/// - Generic record encryption and decryption
/// - Named helpers for tasks, conversation activities, and the assistant
pub struct EncryptionService<T: KmsTransport, C: CryptoProvider> {
    client: Arc<KmsClient<T>>,
    codec: FieldCodec<T, C>,
    config: ServiceConfig,
}

impl<T: KmsTransport, C: CryptoProvider> EncryptionService<T, C> {
    /// Create a service over `transport` with the given crypto provider.
    pub fn new(transport: T, crypto: C, config: ServiceConfig) -> Self {
        let client = Arc::new(KmsClient::new(transport, config.kms.clone()));
        Self::from_parts(client, Arc::new(crypto), config)
    }

    /// Create a service around an existing client.
    ///
    /// `config.kms` is ignored; the client keeps its own configuration.
    pub fn from_parts(client: Arc<KmsClient<T>>, crypto: Arc<C>, config: ServiceConfig) -> Self {
        let codec = FieldCodec::new(ContextKeyBinder::new(Arc::clone(&client)), crypto);
        Self {
            client,
            codec,
            config,
        }
    }

    pub fn client(&self) -> &Arc<KmsClient<T>> {
        &self.client
    }

    pub fn codec(&self) -> &FieldCodec<T, C> {
        &self.codec
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Contexts
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a context for a new resource.
    pub async fn new_context(&self) -> Result<EncryptionContext> {
        let context = EncryptionContext::new();
        if self.config.prime_contexts {
            let uri = self.codec.binder().prime(&context).await?;
            debug!(uri = %uri, "opened primed context");
        }
        Ok(context)
    }

    /// Open a context for a resource that already has a key.
    pub fn resume_context(&self, uri: KeyUri) -> EncryptionContext {
        EncryptionContext::with_key_url(uri)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Generic Records
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn encrypt<R: Encryptable>(
        &self,
        record: &mut R,
        context: &EncryptionContext,
    ) -> Result<()> {
        Ok(self.codec.encrypt(record, context).await?)
    }

    pub async fn decrypt<R: Encryptable>(&self, record: Option<&mut R>) -> Result<()> {
        Ok(self.codec.decrypt(record).await?)
    }

    pub async fn decrypt_many<R: Encryptable>(&self, records: Option<&mut [R]>) -> Result<()> {
        Ok(self.codec.decrypt_many(records).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn encrypt_task_request(
        &self,
        request: &mut TaskRequest,
        context: &EncryptionContext,
    ) -> Result<()> {
        self.encrypt(request, context).await
    }

    pub async fn decrypt_task(&self, task: Option<&mut Task>) -> Result<()> {
        self.decrypt(task).await
    }

    pub async fn decrypt_tasks(&self, tasks: Option<&mut [Task]>) -> Result<()> {
        self.decrypt_many(tasks).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversation
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn encrypt_activity(
        &self,
        activity: &mut Activity,
        context: &EncryptionContext,
    ) -> Result<()> {
        self.encrypt(activity, context).await
    }

    pub async fn decrypt_activity(&self, activity: Option<&mut Activity>) -> Result<()> {
        self.decrypt(activity).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assistant
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn encrypt_assistant_request(
        &self,
        request: &mut AssistantRequest,
        context: &EncryptionContext,
    ) -> Result<()> {
        self.encrypt(request, context).await
    }

    pub async fn decrypt_assistant_response(
        &self,
        response: Option<&mut AssistantResponse>,
    ) -> Result<()> {
        self.decrypt(response).await
    }
}

impl<T: KmsTransport> EncryptionService<T, LocalCryptoProvider<T>> {
    /// A service that seals fields in-process with keys from the broker.
    pub fn with_local_crypto(transport: T, config: ServiceConfig) -> Self {
        let client = Arc::new(KmsClient::new(transport, config.kms.clone()));
        let crypto = Arc::new(LocalCryptoProvider::new(Arc::clone(&client)));
        Self::from_parts(client, crypto, config)
    }
}
