//! The key broker client.
//!
//! Builds broker requests, follows a single migration redirect, and turns
//! broker replies into key material.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sealfield_core::{codes, KeyMaterial, KeyUri, KmsError};

use crate::cache::{KeyCache, DEFAULT_CAPACITY};
use crate::error::{ClientError, Result};
use crate::messages::{
    endpoints, Authorization, CustomerMasterKey, KmsMethod, KmsRequest, KmsResource, KmsResponse,
    RequestOptions,
};
use crate::transport::KmsTransport;

/// Configuration for the broker client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KmsConfig {
    /// Keep resolved keys in a client-owned cache.
    pub cache_resolved_keys: bool,
    /// Maximum number of cached keys.
    pub key_cache_capacity: usize,
}

impl Default for KmsConfig {
    fn default() -> Self {
        Self {
            cache_resolved_keys: true,
            key_cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Organization scope of a customer-master-key operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterKeyScope {
    pub assigned_org_id: String,
    /// Keys live in AWS KMS rather than in the broker.
    #[serde(default)]
    pub aws_kms: bool,
}

impl MasterKeyScope {
    pub fn new(assigned_org_id: impl Into<String>, aws_kms: bool) -> Self {
        Self {
            assigned_org_id: assigned_org_id.into(),
            aws_kms,
        }
    }

    fn request(&self, method: KmsMethod) -> KmsRequest {
        KmsRequest {
            assigned_org_id: Some(self.assigned_org_id.clone()),
            ..KmsRequest::new(method, endpoints::cmk(self.aws_kms))
        }
    }
}

/// Arguments for uploading a customer master key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterKeyUpload {
    pub assigned_org_id: String,
    #[serde(default)]
    pub aws_kms: bool,
    #[serde(default)]
    pub customer_master_key: Option<String>,
    /// AWS only.
    #[serde(default)]
    pub customer_master_key_role: Option<String>,
    /// AWS only.
    #[serde(default)]
    pub customer_master_key_backup: Option<String>,
}

/// Client for the key broker.
pub struct KmsClient<T: KmsTransport> {
    transport: T,
    config: KmsConfig,
    cache: Option<KeyCache>,
}

impl<T: KmsTransport> KmsClient<T> {
    /// Create a client over `transport`.
    pub fn new(transport: T, config: KmsConfig) -> Self {
        let cache = config
            .cache_resolved_keys
            .then(|| KeyCache::new(config.key_cache_capacity));
        Self {
            transport,
            config,
            cache,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &KmsConfig {
        &self.config
    }

    /// The resolved-key cache, when enabled.
    pub fn cache(&self) -> Option<&KeyCache> {
        self.cache.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a key by URI.
    ///
    /// A migrated key (error code 301002 with a `redirectUri`) is fetched once
    /// more from the redirect target, with the same options; the returned
    /// material carries the new canonical URI. No further hops are followed.
    pub async fn retrieve_key(&self, uri: &KeyUri, options: RequestOptions) -> Result<KeyMaterial> {
        if uri.is_empty() {
            return Err(ClientError::MissingParameter("options.uri"));
        }

        let options = options.into_option();
        let cache = self.cache.as_ref().filter(|_| options.is_none());

        if let Some(hit) = cache.and_then(|cache| cache.get(uri)) {
            debug!(uri = %uri, "key cache hit");
            return Ok(hit);
        }

        let first = self.send(KmsRequest::retrieve(uri.as_str()), options.clone()).await;
        let (response, resolved) = match redirect_target(&first) {
            Some(target) => {
                debug!(from = %uri, to = %target, "following key migration");
                let response = self.send(KmsRequest::retrieve(&target), options).await?;
                (response, KeyUri::new(target))
            }
            None => (first?, uri.clone()),
        };

        let material = key_from_response(response, &resolved)?;
        if let Some(cache) = cache {
            cache.insert(uri, material.clone());
        }
        Ok(material)
    }

    /// Create keys not yet bound to any resource.
    ///
    /// Always returns a vector, even for `count == 1`.
    pub async fn create_unbound_keys(&self, count: u32) -> Result<Vec<KeyMaterial>> {
        let response = self.send_checked(KmsRequest::create_unbound(count), None).await?;
        let keys = response
            .keys
            .into_iter()
            .map(|key| key.into_material(None))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(requested = count, created = keys.len(), "created unbound keys");
        Ok(keys)
    }

    /// Bind an unbound key to a resource.
    pub async fn bind_key(&self, resource_uri: &str, key_uri: &KeyUri) -> Result<KeyMaterial> {
        if resource_uri.is_empty() {
            return Err(ClientError::MissingParameter("resourceUri"));
        }
        if key_uri.is_empty() {
            return Err(ClientError::MissingParameter("keyUri"));
        }

        let request = KmsRequest {
            resource_uri: Some(resource_uri.to_string()),
            ..KmsRequest::new(KmsMethod::Update, key_uri.as_str())
        };
        let response = self.send_checked(request, None).await?;
        key_from_response(response, key_uri)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resources and authorizations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a resource holding `key_uris`, authorizing `user_ids`.
    pub async fn create_resource(
        &self,
        key_uris: &[KeyUri],
        user_ids: &[String],
    ) -> Result<KmsResource> {
        let request = KmsRequest {
            key_uris: key_uris.iter().map(|uri| uri.as_str().to_string()).collect(),
            user_ids: user_ids.to_vec(),
            ..KmsRequest::new(KmsMethod::Create, endpoints::RESOURCES)
        };
        self.send_checked(request, None)
            .await?
            .resource
            .ok_or_else(|| ClientError::InvalidResponse("response carries no resource".into()))
    }

    /// Authorize users on a resource.
    pub async fn add_authorizations(
        &self,
        resource_uri: &str,
        user_ids: &[String],
    ) -> Result<Vec<Authorization>> {
        let request = KmsRequest {
            user_ids: user_ids.to_vec(),
            ..authorization_request(KmsMethod::Create, resource_uri)?
        };
        Ok(self.send_checked(request, None).await?.authorizations)
    }

    /// List the authorizations on a resource.
    pub async fn list_authorizations(&self, resource_uri: &str) -> Result<Vec<Authorization>> {
        let request = authorization_request(KmsMethod::Retrieve, resource_uri)?;
        Ok(self.send_checked(request, None).await?.authorizations)
    }

    /// Remove one user's authorization from a resource.
    pub async fn remove_authorization(&self, resource_uri: &str, user_id: &str) -> Result<()> {
        if user_id.is_empty() {
            return Err(ClientError::MissingParameter("authId"));
        }
        let request = KmsRequest {
            auth_id: Some(user_id.to_string()),
            ..authorization_request(KmsMethod::Delete, resource_uri)?
        };
        self.send_checked(request, None).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Customer master keys
    // ─────────────────────────────────────────────────────────────────────────

    /// List an organization's master keys.
    pub async fn list_all_customer_master_keys(
        &self,
        scope: &MasterKeyScope,
    ) -> Result<Vec<CustomerMasterKey>> {
        let response = self.send_checked(scope.request(KmsMethod::Retrieve), None).await?;
        Ok(response.customer_master_keys)
    }

    /// Upload a master key.
    ///
    /// Role and backup are only forwarded for AWS KMS organizations; for
    /// everyone else they are dropped before the request is built.
    pub async fn upload_customer_master_key(
        &self,
        upload: MasterKeyUpload,
    ) -> Result<Vec<CustomerMasterKey>> {
        let MasterKeyUpload {
            assigned_org_id,
            aws_kms,
            customer_master_key,
            customer_master_key_role,
            customer_master_key_backup,
        } = upload;

        let (role, backup) = if aws_kms {
            (customer_master_key_role, customer_master_key_backup)
        } else {
            (None, None)
        };

        let request = KmsRequest {
            customer_master_key,
            customer_master_key_role: role,
            customer_master_key_backup: backup,
            ..MasterKeyScope::new(assigned_org_id, aws_kms).request(KmsMethod::Create)
        };
        Ok(self.send_checked(request, None).await?.customer_master_keys)
    }

    /// Make `key_id` the organization's active master key.
    pub async fn change_customer_master_key(
        &self,
        scope: &MasterKeyScope,
        key_id: &str,
    ) -> Result<Vec<CustomerMasterKey>> {
        if key_id.is_empty() {
            return Err(ClientError::MissingParameter("keyId"));
        }
        let request = KmsRequest {
            key_id: Some(key_id.to_string()),
            ..scope.request(KmsMethod::Update)
        };
        Ok(self.send_checked(request, None).await?.customer_master_keys)
    }

    /// Delete every master key of an organization.
    pub async fn delete_all_customer_master_keys(
        &self,
        scope: &MasterKeyScope,
    ) -> Result<Vec<CustomerMasterKey>> {
        let response = self.send_checked(scope.request(KmsMethod::Delete), None).await?;
        Ok(response.customer_master_keys)
    }

    /// Liveness check against the broker.
    pub async fn ping(&self) -> Result<()> {
        self.send_checked(KmsRequest::new(KmsMethod::Update, endpoints::PING), None)
            .await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    async fn send(
        &self,
        request: KmsRequest,
        options: Option<RequestOptions>,
    ) -> Result<KmsResponse> {
        debug!(method = ?request.method, uri = %request.uri, "kms request");
        let result = self.transport.request(request, options).await;
        if let Err(err) = &result {
            warn!(error = %err, "kms request failed");
        }
        result
    }

    /// Send, treating a failure status in a resolved reply as a broker error.
    async fn send_checked(
        &self,
        request: KmsRequest,
        options: Option<RequestOptions>,
    ) -> Result<KmsResponse> {
        let response = self.send(request, options).await?;
        if response.is_failure() {
            return Err(ClientError::Broker(KmsError::from_response(&response)));
        }
        Ok(response)
    }
}

/// The redirect target of a migration reply, resolved or rejected.
fn redirect_target(result: &Result<KmsResponse>) -> Option<String> {
    let (code, target) = match result {
        Ok(response) => (response.error_code, response.redirect_uri.as_deref()),
        Err(ClientError::Broker(err)) => (
            Some(err.error_code()),
            err.redirect_uri().map(KeyUri::as_str),
        ),
        Err(_) => return None,
    };
    match (code, target) {
        (Some(codes::KEY_MIGRATED), Some(target)) if !target.is_empty() => {
            Some(target.to_string())
        }
        _ => None,
    }
}

/// Key material from a reply: `key.uri`, else the reply's `uri`, else the
/// URI that was asked for. A reply without a key is a broker failure.
fn key_from_response(response: KmsResponse, requested: &KeyUri) -> Result<KeyMaterial> {
    let Some(key) = response.key.clone() else {
        return Err(ClientError::Broker(KmsError::from_response(&response)));
    };
    let fallback = response
        .uri
        .filter(|uri| !uri.is_empty())
        .unwrap_or_else(|| requested.as_str().to_string());
    Ok(key.into_material(Some(&fallback))?)
}

fn authorization_request(method: KmsMethod, resource_uri: &str) -> Result<KmsRequest> {
    if resource_uri.is_empty() {
        return Err(ClientError::MissingParameter("resourceUri"));
    }
    Ok(KmsRequest {
        resource_uri: Some(resource_uri.to_string()),
        ..KmsRequest::new(method, endpoints::AUTHORIZATIONS)
    })
}
