//! Transport abstraction for broker requests.
//!
//! The transport owns the actual exchange with the broker: framing, auth
//! headers, retries. Sealfield only requires that broker status and error
//! codes come back verbatim, either in a resolved [`KmsResponse`] or as a
//! [`ClientError::Broker`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::messages::{KmsRequest, KmsResponse, RequestOptions};

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Transport trait for issuing broker requests.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait KmsTransport: Send + Sync {
    /// Send one request and wait for the broker's answer.
    ///
    /// `options` is `None` unless the caller set at least one option.
    async fn request(
        &self,
        request: KmsRequest,
        options: Option<RequestOptions>,
    ) -> Result<KmsResponse>;
}

#[async_trait]
impl<T: KmsTransport + ?Sized> KmsTransport for Arc<T> {
    async fn request(
        &self,
        request: KmsRequest,
        options: Option<RequestOptions>,
    ) -> Result<KmsResponse> {
        (**self).request(request, options).await
    }
}

/// A simple in-memory broker for testing.
///
/// Mints keys, simulates key migrations, serves scripted responses, and
/// records every request it receives.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, VecDeque};

    use parking_lot::Mutex;
    use rand::RngCore;
    use serde_json::json;

    use sealfield_core::{codes, KmsError};

    use crate::messages::{
        endpoints, Authorization, CustomerMasterKey, KmsMethod, KmsResource, WireKey,
    };

    /// A request as the broker saw it.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        pub request: KmsRequest,
        pub options: Option<RequestOptions>,
    }

    /// A canned answer served before normal dispatch.
    #[derive(Debug, Clone)]
    enum Scripted {
        Reply(KmsResponse),
        BrokerFailure(KmsResponse),
        TransportFailure(String),
    }

    #[derive(Default)]
    struct BrokerState {
        keys: HashMap<String, WireKey>,
        /// old uri -> new uri
        migrations: HashMap<String, String>,
        scripted: VecDeque<Scripted>,
        calls: Vec<RecordedCall>,
        resources: HashMap<String, KmsResource>,
        authorizations: HashMap<String, Vec<Authorization>>,
        master_keys: HashMap<(String, bool), Vec<CustomerMasterKey>>,
        request_seq: u64,
    }

    /// In-memory broker implementation.
    pub struct MemoryBroker {
        host: String,
        state: Mutex<BrokerState>,
    }

    impl MemoryBroker {
        /// Create a broker that mints `kms://<host>/keys/<id>` URIs.
        pub fn new(host: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                host: host.into(),
                state: Mutex::new(BrokerState::default()),
            })
        }

        pub fn host(&self) -> &str {
            &self.host
        }

        /// Store a key under `uri`.
        pub fn insert_key(&self, uri: impl Into<String>, jwk: serde_json::Value) {
            let uri = uri.into();
            self.state
                .lock()
                .keys
                .insert(uri.clone(), WireKey::new(uri, jwk));
        }

        /// Move a key to a new URI; retrieving the old one answers 301002.
        pub fn migrate_key(&self, from: &str, to: impl Into<String>) {
            let to = to.into();
            let mut state = self.state.lock();
            if let Some(mut key) = state.keys.remove(from) {
                key.uri = Some(to.clone());
                state.keys.insert(to.clone(), key);
            }
            state.migrations.insert(from.to_string(), to);
        }

        /// Serve `response` to the next request, whatever it is.
        pub fn push_response(&self, response: KmsResponse) {
            self.state.lock().scripted.push_back(Scripted::Reply(response));
        }

        /// Reject the next request with a broker error built from `response`.
        pub fn push_failure(&self, response: KmsResponse) {
            self.state
                .lock()
                .scripted
                .push_back(Scripted::BrokerFailure(response));
        }

        /// Fail the next request at the transport level.
        pub fn push_transport_error(&self, message: impl Into<String>) {
            self.state
                .lock()
                .scripted
                .push_back(Scripted::TransportFailure(message.into()));
        }

        /// Every request received so far, in order.
        pub fn calls(&self) -> Vec<RecordedCall> {
            self.state.lock().calls.clone()
        }

        pub fn call_count(&self) -> usize {
            self.state.lock().calls.len()
        }

        /// Requests whose `uri` equals `uri`.
        pub fn calls_to(&self, uri: &str) -> Vec<RecordedCall> {
            self.state
                .lock()
                .calls
                .iter()
                .filter(|call| call.request.uri == uri)
                .cloned()
                .collect()
        }

        pub fn clear_calls(&self) {
            self.state.lock().calls.clear();
        }

        /// Number of keys minted or inserted.
        pub fn key_count(&self) -> usize {
            self.state.lock().keys.len()
        }

        fn dispatch(&self, state: &mut BrokerState, request: &KmsRequest) -> Result<KmsResponse> {
            state.request_seq += 1;
            let request_id = format!("memory-{}", state.request_seq);

            let response = match (request.method, request.uri.as_str()) {
                (KmsMethod::Create, endpoints::KEYS) => {
                    let count = request.count.unwrap_or(1);
                    let keys = (0..count).map(|_| self.mint_key(state)).collect();
                    KmsResponse {
                        keys,
                        ..KmsResponse::with_status(201)
                    }
                }
                (KmsMethod::Create, endpoints::RESOURCES) => {
                    let uri = format!("kms://{}/resources/{}", self.host, random_id());
                    let resource = KmsResource {
                        uri: uri.clone(),
                        key_uris: request.key_uris.clone(),
                        authorization_uris: Vec::new(),
                    };
                    state.resources.insert(uri, resource.clone());
                    let auths = self.authorize(state, &resource.uri, &request.user_ids);
                    let resource = state
                        .resources
                        .get(&resource.uri)
                        .cloned()
                        .unwrap_or(resource);
                    KmsResponse {
                        resource: Some(resource),
                        authorizations: auths,
                        ..KmsResponse::with_status(201)
                    }
                }
                (method, endpoints::AUTHORIZATIONS) => {
                    let resource_uri = request.resource_uri.clone().unwrap_or_default();
                    if !state.resources.contains_key(&resource_uri) {
                        return Err(not_found(&request_id, "resource not found"));
                    }
                    match method {
                        KmsMethod::Create => {
                            let created = self.authorize(state, &resource_uri, &request.user_ids);
                            KmsResponse {
                                authorizations: created,
                                ..KmsResponse::with_status(201)
                            }
                        }
                        KmsMethod::Retrieve => KmsResponse {
                            authorizations: state
                                .authorizations
                                .get(&resource_uri)
                                .cloned()
                                .unwrap_or_default(),
                            ..KmsResponse::with_status(200)
                        },
                        KmsMethod::Delete => {
                            let auth_id = request.auth_id.clone().unwrap_or_default();
                            let list = state.authorizations.entry(resource_uri).or_default();
                            let before = list.len();
                            list.retain(|auth| auth.auth_id != auth_id);
                            if list.len() == before {
                                return Err(not_found(&request_id, "authorization not found"));
                            }
                            KmsResponse::with_status(200)
                        }
                        KmsMethod::Update => {
                            return Err(bad_request(&request_id, "unsupported method"))
                        }
                    }
                }
                (method, endpoints::CMK) | (method, endpoints::AWS_KMS_CMK) => {
                    let aws = request.uri == endpoints::AWS_KMS_CMK;
                    let org = request.assigned_org_id.clone().unwrap_or_default();
                    let keys = state.master_keys.entry((org.clone(), aws)).or_default();
                    match method {
                        KmsMethod::Retrieve => {}
                        KmsMethod::Create => {
                            let uri = request
                                .customer_master_key
                                .clone()
                                .unwrap_or_else(|| format!("cmk-{}", random_id()));
                            let status = if keys.is_empty() { "ACTIVE" } else { "PENDING" };
                            keys.push(CustomerMasterKey {
                                uri,
                                status: status.to_string(),
                                assigned_org_id: Some(org),
                                backup: request.customer_master_key_backup.clone(),
                            });
                        }
                        KmsMethod::Update => {
                            let key_id = request.key_id.clone().unwrap_or_default();
                            if !keys.iter().any(|key| key.uri == key_id) {
                                return Err(not_found(&request_id, "master key not found"));
                            }
                            for key in keys.iter_mut() {
                                let status = if key.uri == key_id { "ACTIVE" } else { "INACTIVE" };
                                key.status = status.to_string();
                            }
                        }
                        KmsMethod::Delete => keys.clear(),
                    }
                    KmsResponse {
                        customer_master_keys: keys.clone(),
                        ..KmsResponse::with_status(200)
                    }
                }
                (KmsMethod::Update, endpoints::PING) => KmsResponse::with_status(200),
                (KmsMethod::Retrieve, uri) => {
                    if let Some(target) = state.migrations.get(uri) {
                        KmsResponse::failure(301, codes::KEY_MIGRATED, "key migrated")
                            .redirect_to(target.clone())
                    } else if let Some(key) = state.keys.get(uri) {
                        KmsResponse::with_key(key.clone())
                    } else {
                        return Err(not_found(&request_id, "key not found"));
                    }
                }
                (KmsMethod::Update, uri) => {
                    let Some(resource_uri) = request.resource_uri.clone() else {
                        return Err(bad_request(&request_id, "resourceUri is required"));
                    };
                    let Some(key) = state.keys.get_mut(uri) else {
                        return Err(not_found(&request_id, "key not found"));
                    };
                    key.resource_uri = Some(resource_uri.clone());
                    let key = key.clone();
                    if let Some(resource) = state.resources.get_mut(&resource_uri) {
                        resource.key_uris.push(uri.to_string());
                    }
                    KmsResponse::with_key(key)
                }
                _ => return Err(bad_request(&request_id, "unsupported request")),
            };

            Ok(response.request_id(request_id))
        }

        fn mint_key(&self, state: &mut BrokerState) -> WireKey {
            let uri = format!("kms://{}/keys/{}", self.host, random_id());
            let mut secret = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut secret);
            let key = WireKey::new(uri.clone(), json!({"kty": "oct", "k": hex::encode(secret)}));
            state.keys.insert(uri, key.clone());
            key
        }

        fn authorize(
            &self,
            state: &mut BrokerState,
            resource_uri: &str,
            user_ids: &[String],
        ) -> Vec<Authorization> {
            let created: Vec<Authorization> = user_ids
                .iter()
                .map(|user| Authorization {
                    uri: format!("{}/authorizations/{}", resource_uri, user),
                    auth_id: user.clone(),
                    resource_uri: Some(resource_uri.to_string()),
                })
                .collect();
            if let Some(resource) = state.resources.get_mut(resource_uri) {
                resource
                    .authorization_uris
                    .extend(created.iter().map(|auth| auth.uri.clone()));
            }
            state
                .authorizations
                .entry(resource_uri.to_string())
                .or_default()
                .extend(created.iter().cloned());
            created
        }
    }

    #[async_trait]
    impl KmsTransport for MemoryBroker {
        async fn request(
            &self,
            request: KmsRequest,
            options: Option<RequestOptions>,
        ) -> Result<KmsResponse> {
            // Give concurrent callers a chance to interleave, as a real round trip would.
            tokio::task::yield_now().await;

            let mut state = self.state.lock();
            state.calls.push(RecordedCall {
                request: request.clone(),
                options,
            });

            match state.scripted.pop_front() {
                Some(Scripted::Reply(response)) => Ok(response),
                Some(Scripted::BrokerFailure(response)) => {
                    Err(ClientError::Broker(KmsError::from_response(&response)))
                }
                Some(Scripted::TransportFailure(message)) => Err(ClientError::Transport(message)),
                None => self.dispatch(&mut state, &request),
            }
        }
    }

    fn random_id() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn not_found(request_id: &str, reason: &str) -> ClientError {
        let response = KmsResponse::failure(404, 404_001, reason).request_id(request_id);
        ClientError::Broker(KmsError::from_response(&response))
    }

    fn bad_request(request_id: &str, reason: &str) -> ClientError {
        let response = KmsResponse::failure(400, 400_001, reason).request_id(request_id);
        ClientError::Broker(KmsError::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryBroker;
    use super::*;
    use crate::messages::KmsMethod;

    #[tokio::test]
    async fn test_memory_broker_mints_and_retrieves() {
        let broker = MemoryBroker::new("test-kms.com");

        let created = broker
            .request(KmsRequest::create_unbound(2), None)
            .await
            .unwrap();
        assert_eq!(created.keys.len(), 2);

        let uri = created.keys[0].uri.clone().unwrap();
        assert!(uri.starts_with("kms://test-kms.com/keys/"));

        let fetched = broker
            .request(KmsRequest::retrieve(uri.clone()), None)
            .await
            .unwrap();
        assert_eq!(fetched.key.unwrap().uri.as_deref(), Some(uri.as_str()));
        assert_eq!(broker.call_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_broker_migration_answers_redirect() {
        let broker = MemoryBroker::new("kms");
        broker.insert_key("kms://kms/keys/old", serde_json::json!({"k": "1"}));
        broker.migrate_key("kms://kms/keys/old", "kms://kms/keys/new");

        let response = broker
            .request(KmsRequest::retrieve("kms://kms/keys/old"), None)
            .await
            .unwrap();
        assert_eq!(response.error_code, Some(sealfield_core::codes::KEY_MIGRATED));
        assert_eq!(response.redirect_uri.as_deref(), Some("kms://kms/keys/new"));
        assert!(response.key.is_none());
    }

    #[tokio::test]
    async fn test_memory_broker_unknown_key_is_broker_error() {
        let broker = MemoryBroker::new("kms");
        let err = broker
            .request(KmsRequest::retrieve("kms://kms/keys/missing"), None)
            .await
            .unwrap_err();
        let kms = err.as_kms_error().unwrap();
        assert_eq!(kms.status(), 404);
        assert_eq!(kms.request_id(), "memory-1");
    }

    #[tokio::test]
    async fn test_memory_broker_scripted_and_recorded() {
        let broker = MemoryBroker::new("kms");
        broker.push_transport_error("offline");

        let options = RequestOptions::on_behalf_of("user-7").into_option();
        let err = broker
            .request(KmsRequest::retrieve("kms://kms/keys/x"), options.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(ref msg) if msg == "offline"));

        let calls = broker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].request.method, KmsMethod::Retrieve);
        assert_eq!(calls[0].options, options);
    }
}
