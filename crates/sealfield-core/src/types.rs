//! Strong type definitions for Sealfield.
//!
//! Key identifiers are newtypes so a key URI is never confused with an
//! arbitrary string field of a record.

use serde::{Deserialize, Serialize};
use std::fmt;

const KMS_SCHEME: &str = "kms://";

/// A key identifier issued by the broker, usually `kms://host/keys/id`.
///
/// Not stable: the broker may migrate a key and hand back a different
/// canonical URI for it. Always persist the last resolved value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyUri(String);

impl KeyUri {
    /// Wrap a URI string. No validation is performed.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Broker host, for `kms://` URIs.
    pub fn host(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(KMS_SCHEME)?;
        let host = rest.split('/').next()?;
        (!host.is_empty()).then_some(host)
    }

    /// Key id, for `kms://host/keys/<id>` URIs.
    pub fn key_id(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(KMS_SCHEME)?;
        let mut parts = rest.splitn(3, '/');
        let _host = parts.next()?;
        if parts.next()? != "keys" {
            return None;
        }
        parts.next().filter(|id| !id.is_empty())
    }
}

impl fmt::Debug for KeyUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyUri({})", self.0)
    }
}

impl fmt::Display for KeyUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for KeyUri {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

/// A resolved key.
///
/// `jwk` is opaque to Sealfield; it is only forwarded to the crypto
/// primitive collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMaterial {
    pub uri: KeyUri,
    pub jwk: serde_json::Value,
}

impl KeyMaterial {
    pub fn new(uri: impl Into<KeyUri>, jwk: serde_json::Value) -> Self {
        Self {
            uri: uri.into(),
            jwk,
        }
    }
}

/// The key argument handed to `encrypt_text` / `decrypt_text`.
///
/// Either a bare URI or resolved material; [`KeyRef::uri`] prefers the
/// material's own URI.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRef {
    Uri(KeyUri),
    Material(KeyMaterial),
}

impl KeyRef {
    pub fn uri(&self) -> &KeyUri {
        match self {
            KeyRef::Uri(uri) => uri,
            KeyRef::Material(material) => &material.uri,
        }
    }

    /// The JWK, when the caller already holds resolved material.
    pub fn material(&self) -> Option<&KeyMaterial> {
        match self {
            KeyRef::Uri(_) => None,
            KeyRef::Material(material) => Some(material),
        }
    }
}

impl From<KeyUri> for KeyRef {
    fn from(uri: KeyUri) -> Self {
        KeyRef::Uri(uri)
    }
}

impl From<KeyMaterial> for KeyRef {
    fn from(material: KeyMaterial) -> Self {
        KeyRef::Material(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_uri_parts() {
        let uri = KeyUri::new("kms://test-kms.com/keys/test-key");
        assert_eq!(uri.host(), Some("test-kms.com"));
        assert_eq!(uri.key_id(), Some("test-key"));
        assert_eq!(uri.to_string(), "kms://test-kms.com/keys/test-key");
    }

    #[test]
    fn test_opaque_key_uri() {
        let uri = KeyUri::new("test-key-uri");
        assert_eq!(uri.host(), None);
        assert_eq!(uri.key_id(), None);
        assert!(!uri.is_empty());
    }

    #[test]
    fn test_key_uri_serializes_as_string() {
        let uri = KeyUri::new("kms://a/keys/b");
        assert_eq!(serde_json::to_string(&uri).unwrap(), "\"kms://a/keys/b\"");
    }

    #[test]
    fn test_key_ref_prefers_material_uri() {
        let material = KeyMaterial::new("kms://a/keys/canonical", serde_json::json!({}));
        let key: KeyRef = material.clone().into();
        assert_eq!(key.uri().as_str(), "kms://a/keys/canonical");
        assert_eq!(key.material(), Some(&material));

        let bare: KeyRef = KeyUri::new("kms://a/keys/bare").into();
        assert_eq!(bare.uri().as_str(), "kms://a/keys/bare");
        assert!(bare.material().is_none());
    }

    proptest! {
        #[test]
        fn test_key_id_roundtrip(host in "[a-z][a-z0-9.-]{0,20}", id in "[A-Za-z0-9-]{1,36}") {
            let uri = KeyUri::new(format!("kms://{}/keys/{}", host, id));
            prop_assert_eq!(uri.host(), Some(host.as_str()));
            prop_assert_eq!(uri.key_id(), Some(id.as_str()));
        }
    }
}
