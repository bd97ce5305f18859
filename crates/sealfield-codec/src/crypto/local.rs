//! ChaCha20-Poly1305 provider keyed from broker JWKs.
//!
//! The cipher key is `blake3::derive_key` over the canonical JSON of the
//! key's JWK, so a migrated key keeps decrypting what it encrypted before the
//! move. Output is lowercase hex of `nonce || ciphertext || tag`.

use std::sync::Arc;

use async_trait::async_trait;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use sealfield_core::{KeyMaterial, KeyRef};
use sealfield_kms::{KmsClient, KmsTransport, RequestOptions};

use super::CryptoProvider;
use crate::error::CryptoError;

const KEY_CONTEXT: &str = "sealfield-local-v0-field-key";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Resolves keys through a [`KmsClient`] and seals text locally.
pub struct LocalCryptoProvider<T: KmsTransport> {
    client: Arc<KmsClient<T>>,
}

impl<T: KmsTransport> LocalCryptoProvider<T> {
    pub fn new(client: Arc<KmsClient<T>>) -> Self {
        Self { client }
    }

    async fn resolve(&self, key: &KeyRef) -> Result<KeyMaterial, CryptoError> {
        match key {
            KeyRef::Material(material) => Ok(material.clone()),
            KeyRef::Uri(uri) => Ok(self
                .client
                .retrieve_key(uri, RequestOptions::default())
                .await?),
        }
    }
}

/// Cipher keyed from `material`. Failures are key errors in both directions.
fn cipher_for(material: &KeyMaterial) -> Result<ChaCha20Poly1305, CryptoError> {
    let canonical =
        serde_json::to_vec(&material.jwk).map_err(|e| key_error("unreadable jwk", e))?;
    let key = blake3::derive_key(KEY_CONTEXT, &canonical);
    ChaCha20Poly1305::new_from_slice(&key).map_err(|e| key_error("cipher init", e))
}

fn key_error(stage: &str, err: impl std::fmt::Display) -> CryptoError {
    CryptoError::InvalidKey(format!("{stage}: {err}"))
}

/// Seal `plaintext` under `material`.
pub fn seal(material: &KeyMaterial, plaintext: &str) -> Result<String, CryptoError> {
    let cipher = cipher_for(material)?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(hex::encode(out))
}

/// Open a value produced by [`seal`].
pub fn open(material: &KeyMaterial, ciphertext: &str) -> Result<String, CryptoError> {
    let bytes = hex::decode(ciphertext)
        .map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))?;
    if bytes.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::InvalidCiphertext(format!(
            "expected at least {} bytes, got {}",
            NONCE_LEN + TAG_LEN,
            bytes.len()
        )));
    }

    let (nonce, sealed) = bytes.split_at(NONCE_LEN);
    let plaintext = cipher_for(material)?
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|e| CryptoError::Decrypt(e.to_string()))?;

    String::from_utf8(plaintext).map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))
}

#[async_trait]
impl<T: KmsTransport> CryptoProvider for LocalCryptoProvider<T> {
    async fn encrypt_text(&self, key: &KeyRef, plaintext: &str) -> Result<String, CryptoError> {
        let material = self.resolve(key).await?;
        seal(&material, plaintext)
    }

    async fn decrypt_text(&self, key: &KeyRef, ciphertext: &str) -> Result<String, CryptoError> {
        let material = self.resolve(key).await?;
        open(&material, ciphertext)
    }
}
