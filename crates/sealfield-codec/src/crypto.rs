//! The crypto collaborator used by the field codec.
//!
//! The codec never touches key material itself. It hands each field value
//! and a [`KeyRef`] to a [`CryptoProvider`] and stores whatever comes back.
//! [`local::LocalCryptoProvider`] is a self-contained provider that resolves
//! keys through the broker client and seals text with ChaCha20-Poly1305.

pub mod local;

use std::sync::Arc;

use async_trait::async_trait;

use sealfield_core::KeyRef;

use crate::error::CryptoError;

pub use local::LocalCryptoProvider;

/// Encrypts and decrypts single text values under a broker key.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    async fn encrypt_text(&self, key: &KeyRef, plaintext: &str) -> Result<String, CryptoError>;

    async fn decrypt_text(&self, key: &KeyRef, ciphertext: &str) -> Result<String, CryptoError>;
}

#[async_trait]
impl<C: CryptoProvider + ?Sized> CryptoProvider for Arc<C> {
    async fn encrypt_text(&self, key: &KeyRef, plaintext: &str) -> Result<String, CryptoError> {
        (**self).encrypt_text(key, plaintext).await
    }

    async fn decrypt_text(&self, key: &KeyRef, ciphertext: &str) -> Result<String, CryptoError> {
        (**self).decrypt_text(key, ciphertext).await
    }
}
