//! # Sealfield
//!
//! Client-side field-level encryption backed by a remote key broker.
//!
//! ## Overview
//!
//! Sensitive strings (task titles, message bodies, assistant queries) are
//! encrypted before they leave the client. Each resource gets one broker key,
//! created lazily the first time anything under it is encrypted; the key URL
//! travels with every record so it can be decrypted later.
//!
//! ## Key Concepts
//!
//! - **KeyUri**: broker-issued key identifier; may migrate to a new URI
//! - **EncryptionContext**: the one key URL of a resource
//! - **FieldSpec**: which fields of a record are encrypted
//! - **EncryptionService**: the entry point features call
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealfield::{EncryptionService, ServiceConfig, TaskRequest};
//! use sealfield::kms::MemoryBroker;
//!
//! async fn example() {
//!     let broker = MemoryBroker::new("kms.example.com");
//!     let service = EncryptionService::with_local_crypto(broker, ServiceConfig::default());
//!
//!     let context = service.new_context().await.unwrap();
//!     let mut request = TaskRequest {
//!         title: Some("Quarterly review".into()),
//!         ..TaskRequest::default()
//!     };
//!     service.encrypt_task_request(&mut request, &context).await.unwrap();
//!     assert!(request.encryption_key_url.is_some());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `sealfield::core` - Key identifiers and the broker error type
//! - `sealfield::kms` - Broker client, wire messages, in-memory broker
//! - `sealfield::codec` - Contexts, field specs, crypto providers

pub mod error;
pub mod features;
pub mod service;

// Re-export component crates
pub use sealfield_codec as codec;
pub use sealfield_core as core;
pub use sealfield_kms as kms;

pub use error::{Result, SealfieldError};
pub use features::{
    Activity, ActivityFile, AssistantMessage, AssistantRequest, AssistantResponse, Task,
    TaskRequest,
};
pub use service::{EncryptionService, ServiceConfig};

// Re-export commonly used types
pub use sealfield_codec::{CryptoProvider, Encryptable, EncryptionContext, Field, FieldSpec};
pub use sealfield_core::{KeyMaterial, KeyRef, KeyUri, KmsError};
pub use sealfield_kms::{KmsClient, KmsConfig, KmsTransport, RequestOptions};
