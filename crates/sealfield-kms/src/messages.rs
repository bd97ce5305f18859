//! Broker wire contract.
//!
//! Requests and responses exchanged with the key broker. Field names follow
//! the broker's camelCase JSON.

use serde::{Deserialize, Serialize};

use sealfield_core::{BrokerReply, CoreError, KeyMaterial};

/// Broker endpoints addressed by path rather than by key URI.
pub mod endpoints {
    /// Unbound key creation.
    pub const KEYS: &str = "/keys";
    /// Resource creation.
    pub const RESOURCES: &str = "/resources";
    /// Authorization management.
    pub const AUTHORIZATIONS: &str = "/authorizations";
    /// Customer master keys held by the broker.
    pub const CMK: &str = "/cmk";
    /// Customer master keys held in AWS KMS.
    pub const AWS_KMS_CMK: &str = "/awsKmsCmk";
    /// Liveness check.
    pub const PING: &str = "/ping";

    /// Master-key endpoint for an organization.
    pub fn cmk(aws_kms: bool) -> &'static str {
        if aws_kms {
            AWS_KMS_CMK
        } else {
            CMK
        }
    }
}

/// Broker request verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KmsMethod {
    Create,
    Retrieve,
    Update,
    Delete,
}

/// A request body sent to the broker.
///
/// Only `method` and `uri` are always present; every other field is
/// omitted from the wire when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsRequest {
    pub method: KmsMethod,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_master_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_master_key_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_master_key_backup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<String>,
}

impl KmsRequest {
    /// A bare request; everything but `method` and `uri` unset.
    pub fn new(method: KmsMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            count: None,
            assigned_org_id: None,
            customer_master_key: None,
            customer_master_key_role: None,
            customer_master_key_backup: None,
            key_id: None,
            resource_uri: None,
            key_uris: Vec::new(),
            user_ids: Vec::new(),
            auth_id: None,
        }
    }

    /// `{method: 'retrieve', uri}`.
    pub fn retrieve(uri: impl Into<String>) -> Self {
        Self::new(KmsMethod::Retrieve, uri)
    }

    /// `{method: 'create', uri: '/keys', count}`.
    pub fn create_unbound(count: u32) -> Self {
        Self {
            count: Some(count),
            ..Self::new(KmsMethod::Create, endpoints::KEYS)
        }
    }
}

/// Per-request options passed alongside the body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Act on behalf of another user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_behalf_of: Option<String>,
}

impl RequestOptions {
    pub fn on_behalf_of(user: impl Into<String>) -> Self {
        Self {
            on_behalf_of: Some(user.into()),
        }
    }

    /// `Some(self)` when any option is set, so empty options never reach the wire.
    pub fn into_option(self) -> Option<Self> {
        self.on_behalf_of.is_some().then_some(self)
    }
}

/// A key entry in a broker response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub jwk: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
}

impl WireKey {
    pub fn new(uri: impl Into<String>, jwk: serde_json::Value) -> Self {
        Self {
            uri: Some(uri.into()),
            jwk,
            resource_uri: None,
        }
    }

    /// Convert to [`KeyMaterial`], falling back to `fallback_uri` when the
    /// entry carries no URI of its own.
    pub fn into_material(self, fallback_uri: Option<&str>) -> Result<KeyMaterial, CoreError> {
        let uri = self
            .uri
            .filter(|uri| !uri.is_empty())
            .or_else(|| fallback_uri.filter(|uri| !uri.is_empty()).map(String::from))
            .ok_or(CoreError::MissingKeyUri)?;
        Ok(KeyMaterial::new(uri, self.jwk))
    }
}

/// A resource the broker binds keys and authorizations to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsResource {
    pub uri: String,
    #[serde(default)]
    pub key_uris: Vec<String>,
    #[serde(default)]
    pub authorization_uris: Vec<String>,
}

/// An authorization of a user on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub uri: String,
    pub auth_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
}

/// A customer master key registered for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMasterKey {
    pub uri: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

/// A broker response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<WireKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<WireKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<KmsResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorizations: Vec<Authorization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customer_master_keys: Vec<CustomerMasterKey>,
}

impl KmsResponse {
    /// An empty response with the given status.
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            error_code: None,
            reason: None,
            request_id: None,
            redirect_uri: None,
            uri: None,
            key: None,
            keys: Vec::new(),
            resource: None,
            authorizations: Vec::new(),
            customer_master_keys: Vec::new(),
        }
    }

    /// A 200 response carrying one key.
    pub fn with_key(key: WireKey) -> Self {
        Self {
            uri: key.uri.clone(),
            key: Some(key),
            ..Self::with_status(200)
        }
    }

    /// A failure response.
    pub fn failure(status: u16, error_code: u32, reason: impl Into<String>) -> Self {
        Self {
            error_code: Some(error_code),
            reason: Some(reason.into()),
            ..Self::with_status(status)
        }
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn redirect_to(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the broker reported a failure status. A missing status
    /// (`0`) is not a failure.
    pub fn is_failure(&self) -> bool {
        self.status >= 400
    }
}

impl BrokerReply for KmsResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn error_code(&self) -> Option<u32> {
        self.error_code
    }

    fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retrieve_request_wire_shape() {
        let req = KmsRequest::retrieve("kms://test-kms.com/keys/test-key");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"method": "retrieve", "uri": "kms://test-kms.com/keys/test-key"})
        );
    }

    #[test]
    fn test_create_unbound_wire_shape() {
        let value = serde_json::to_value(KmsRequest::create_unbound(1)).unwrap();
        assert_eq!(value, json!({"method": "create", "uri": "/keys", "count": 1}));
    }

    #[test]
    fn test_response_parses_broker_json() {
        let response: KmsResponse = serde_json::from_value(json!({
            "status": 200,
            "key": {"jwk": {"mockKey": "data"}},
            "uri": "test-key-uri"
        }))
        .unwrap();

        assert_eq!(response.uri.as_deref(), Some("test-key-uri"));
        assert_eq!(response.key.unwrap().jwk["mockKey"], "data");
    }

    #[test]
    fn test_redirect_response_parses() {
        let response: KmsResponse = serde_json::from_value(json!({
            "status": 301,
            "errorCode": 301002,
            "reason": "key migrated",
            "requestId": "abc",
            "redirectUri": "kms://new/keys/1"
        }))
        .unwrap();

        assert_eq!(response.error_code, Some(301_002));
        assert_eq!(response.redirect_uri.as_deref(), Some("kms://new/keys/1"));
        assert!(!response.is_success());
    }

    #[test]
    fn test_wire_key_uri_fallback() {
        let key = WireKey {
            uri: None,
            jwk: json!({}),
            resource_uri: None,
        };
        let material = key.clone().into_material(Some("kms://h/keys/k")).unwrap();
        assert_eq!(material.uri.as_str(), "kms://h/keys/k");

        assert!(matches!(
            key.into_material(None),
            Err(CoreError::MissingKeyUri)
        ));
    }

    #[test]
    fn test_empty_options_are_dropped() {
        assert_eq!(RequestOptions::default().into_option(), None);
        assert!(RequestOptions::on_behalf_of("user-1").into_option().is_some());
    }

    #[test]
    fn test_cmk_endpoint() {
        assert_eq!(endpoints::cmk(false), "/cmk");
        assert_eq!(endpoints::cmk(true), "/awsKmsCmk");
    }
}
