//! Deterministic crypto providers for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use sealfield_codec::{CryptoError, CryptoProvider};
use sealfield_core::KeyRef;

/// Encodes values as `<key uri>|<hex plaintext>`.
///
/// Decryption checks the key prefix, so a value opened with the wrong key
/// fails. Plaintexts registered with [`fail_on`](Self::fail_on) are refused.
#[derive(Debug, Default)]
pub struct ReversibleCrypto {
    encrypts: AtomicUsize,
    decrypts: AtomicUsize,
    refused: Mutex<HashSet<String>>,
}

impl ReversibleCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to encrypt `plaintext`.
    pub fn fail_on(&self, plaintext: impl Into<String>) {
        self.refused.lock().insert(plaintext.into());
    }

    /// The ciphertext this provider produces.
    pub fn seal(key: &KeyRef, plaintext: &str) -> String {
        format!("{}|{}", key.uri(), hex::encode(plaintext))
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypts.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypts.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.encrypt_calls() + self.decrypt_calls()
    }
}

#[async_trait]
impl CryptoProvider for ReversibleCrypto {
    async fn encrypt_text(&self, key: &KeyRef, plaintext: &str) -> Result<String, CryptoError> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        if self.refused.lock().contains(plaintext) {
            return Err(CryptoError::Encrypt(format!("refused: {plaintext}")));
        }
        Ok(Self::seal(key, plaintext))
    }

    async fn decrypt_text(&self, key: &KeyRef, ciphertext: &str) -> Result<String, CryptoError> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        let prefix = format!("{}|", key.uri());
        let encoded = ciphertext
            .strip_prefix(&prefix)
            .ok_or_else(|| CryptoError::Decrypt(format!("not sealed under {}", key.uri())))?;
        let bytes =
            hex::decode(encoded).map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))
    }
}

/// Returns the same ciphertext for every encryption and the same plaintext
/// for every decryption.
#[derive(Debug)]
pub struct FixedCrypto {
    ciphertext: String,
    plaintext: String,
    calls: AtomicUsize,
}

impl FixedCrypto {
    pub fn new(ciphertext: impl Into<String>, plaintext: impl Into<String>) -> Self {
        Self {
            ciphertext: ciphertext.into(),
            plaintext: plaintext.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    pub fn plaintext(&self) -> &str {
        &self.plaintext
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CryptoProvider for FixedCrypto {
    async fn encrypt_text(&self, _key: &KeyRef, _plaintext: &str) -> Result<String, CryptoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ciphertext.clone())
    }

    async fn decrypt_text(&self, _key: &KeyRef, _ciphertext: &str) -> Result<String, CryptoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.plaintext.clone())
    }
}
