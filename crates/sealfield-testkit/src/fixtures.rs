//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use sealfield::features::{
    Activity, ActivityFile, AssistantMessage, AssistantRequest, AssistantResponse, Task,
    TaskRequest,
};
use sealfield::{EncryptionService, ServiceConfig};
use sealfield_codec::{CryptoProvider, LocalCryptoProvider};
use sealfield_kms::{KmsClient, KmsConfig, MemoryBroker};

use crate::crypto::ReversibleCrypto;

/// Host of the fixture broker.
pub const TEST_HOST: &str = "test-kms.com";

/// A memory broker and a counting crypto stub.
pub struct TestFixture {
    pub broker: Arc<MemoryBroker>,
    pub crypto: Arc<ReversibleCrypto>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_host(TEST_HOST)
    }

    pub fn with_host(host: &str) -> Self {
        Self {
            broker: MemoryBroker::new(host),
            crypto: Arc::new(ReversibleCrypto::new()),
        }
    }

    /// A client over the fixture broker.
    pub fn client(&self, config: KmsConfig) -> Arc<KmsClient<Arc<MemoryBroker>>> {
        Arc::new(KmsClient::new(Arc::clone(&self.broker), config))
    }

    /// A service using the fixture's [`ReversibleCrypto`].
    pub fn service(&self) -> EncryptionService<Arc<MemoryBroker>, ReversibleCrypto> {
        self.service_with(ServiceConfig::default())
    }

    pub fn service_with(
        &self,
        config: ServiceConfig,
    ) -> EncryptionService<Arc<MemoryBroker>, ReversibleCrypto> {
        self.service_using(Arc::clone(&self.crypto), config)
    }

    /// A service over the fixture broker with any crypto provider.
    pub fn service_using<C: CryptoProvider>(
        &self,
        crypto: Arc<C>,
        config: ServiceConfig,
    ) -> EncryptionService<Arc<MemoryBroker>, C> {
        EncryptionService::from_parts(self.client(config.kms.clone()), crypto, config)
    }

    /// A service that really seals values, keyed from the broker's JWKs.
    pub fn local_service(
        &self,
    ) -> EncryptionService<Arc<MemoryBroker>, LocalCryptoProvider<Arc<MemoryBroker>>> {
        EncryptionService::with_local_crypto(Arc::clone(&self.broker), ServiceConfig::default())
    }

    /// A URI on the fixture broker's host.
    pub fn key_uri(&self, id: &str) -> String {
        format!("kms://{}/keys/{id}", self.broker.host())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Sample records
// ─────────────────────────────────────────────────────────────────────────────

pub fn sample_task_request() -> TaskRequest {
    TaskRequest {
        title: Some("plain text title".into()),
        notes: Some("plain text note".into()),
        due_date: Some("2024-03-01T09:00:00Z".into()),
        status: Some("open".into()),
        encryption_key_url: None,
    }
}

/// A stored task built from an (encrypted) request.
pub fn task_from_request(id: &str, request: &TaskRequest) -> Task {
    Task {
        id: id.to_string(),
        title: request.title.clone(),
        notes: request.notes.clone(),
        due_date: request.due_date.clone(),
        status: request.status.clone(),
        encryption_key_url: request.encryption_key_url.clone(),
    }
}

pub fn sample_activity() -> Activity {
    Activity {
        id: Some("activity-1".into()),
        verb: Some("post".into()),
        display_name: Some("Launch notes".into()),
        content: Some("Ship it on Friday".into()),
        files: vec![
            ActivityFile {
                display_name: Some("plan.docx".into()),
                url: Some("https://files.example.com/plan".into()),
                file_size: Some(2048),
            },
            ActivityFile {
                display_name: Some("budget.xlsx".into()),
                url: Some("https://files.example.com/budget".into()),
                file_size: Some(4096),
            },
        ],
        encryption_key_url: None,
    }
}

pub fn sample_assistant_request() -> AssistantRequest {
    AssistantRequest {
        query: Some("what did I miss yesterday?".into()),
        locale: Some("en-US".into()),
        encryption_key_url: None,
    }
}

pub fn sample_assistant_response() -> AssistantResponse {
    AssistantResponse {
        id: Some("answer-1".into()),
        messages: vec![
            AssistantMessage {
                value: Some("Two new messages in #design".into()),
                format: Some("markdown".into()),
            },
            AssistantMessage {
                value: Some("One meeting was moved".into()),
                format: Some("markdown".into()),
            },
        ],
        encryption_key_url: None,
    }
}
