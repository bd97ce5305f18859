//! # Sealfield Codec
//!
//! Field-level encryption of application records.
//!
//! ## Overview
//!
//! Records declare which of their string fields are sensitive through a
//! [`FieldSpec`]. A [`FieldCodec`] walks that list, hands each non-empty value
//! to a [`CryptoProvider`], and writes the results back in place.
//!
//! ## Key Concepts
//!
//! - **EncryptionContext**: the single key URL shared by everything that
//!   belongs to one resource
//! - **ContextKeyBinder**: creates that key lazily, exactly once per context,
//!   even under concurrent first use
//! - **FieldSpec**: typed accessors for scalar and per-element fields
//! - **CryptoProvider**: the crypto collaborator; [`LocalCryptoProvider`]
//!   seals with ChaCha20-Poly1305 under a key derived from the broker JWK
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sealfield_codec::{ContextKeyBinder, EncryptionContext, FieldCodec, LocalCryptoProvider};
//! use sealfield_kms::{KmsClient, KmsConfig, MemoryBroker};
//!
//! let broker = MemoryBroker::new("kms.example.com");
//! let client = Arc::new(KmsClient::new(broker, KmsConfig::default()));
//! let codec = FieldCodec::new(
//!     ContextKeyBinder::new(Arc::clone(&client)),
//!     Arc::new(LocalCryptoProvider::new(client)),
//! );
//! let context = EncryptionContext::new();
//! // codec.encrypt(&mut record, &context).await?;
//! ```

pub mod binder;
pub mod codec;
pub mod context;
pub mod crypto;
pub mod error;
pub mod fields;

pub use binder::ContextKeyBinder;
pub use codec::FieldCodec;
pub use context::EncryptionContext;
pub use crypto::{CryptoProvider, LocalCryptoProvider};
pub use error::{CodecError, CryptoError, Result};
pub use fields::{Encryptable, Field, FieldSpec};
