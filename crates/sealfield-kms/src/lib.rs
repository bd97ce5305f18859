//! # Sealfield KMS
//!
//! Client for the remote key broker ("KMS").
//!
//! ## Overview
//!
//! [`KmsClient`] builds broker requests and hands them to a [`KmsTransport`].
//! The transport is the seam to the outside world: it may be HTTP, a
//! websocket to the broker, or [`MemoryBroker`] in tests.
//!
//! ## Key Properties
//!
//! - **Precondition checks first**: missing arguments fail before anything is sent
//! - **One redirect hop**: a migrated key (error `301002` + `redirectUri`) is
//!   fetched once more from the new location, never more
//! - **Owned caching**: resolved keys and migration aliases live in a
//!   [`KeyCache`] owned by the client, never in process-wide state
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealfield_kms::{KmsClient, KmsConfig, MemoryBroker, RequestOptions};
//!
//! async fn example() {
//!     let broker = MemoryBroker::new("kms.example.com");
//!     let client = KmsClient::new(broker, KmsConfig::default());
//!
//!     let keys = client.create_unbound_keys(1).await.unwrap();
//!     let key = client
//!         .retrieve_key(&keys[0].uri, RequestOptions::default())
//!         .await
//!         .unwrap();
//!     println!("resolved {}", key.uri);
//! }
//! ```
//!
//! ## Redirect Flow
//!
//! ```text
//! Client                                Broker
//!   |-- retrieve kms://h/keys/old ------->|
//!   |<-- 301002, redirectUri=R -----------|
//!   |-- retrieve R ---------------------->|
//!   |<-- key {uri: R, jwk} ---------------|
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod messages;
pub mod transport;

pub use cache::KeyCache;
pub use client::{KmsClient, KmsConfig, MasterKeyScope, MasterKeyUpload};
pub use error::{ClientError, Result};
pub use messages::{
    endpoints, Authorization, CustomerMasterKey, KmsMethod, KmsRequest, KmsResource, KmsResponse,
    RequestOptions, WireKey,
};
pub use transport::{memory::MemoryBroker, memory::RecordedCall, KmsTransport};
