//! Broker client behavior against the memory broker.

use proptest::prelude::*;
use serde_json::json;

use sealfield_core::{codes, KeyUri};
use sealfield_kms::{ClientError, KmsConfig, KmsMethod, KmsResponse, RequestOptions, WireKey};
use sealfield_testkit::fixtures::TestFixture;
use sealfield_testkit::generators::{key_uri, request_options};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[tokio::test]
async fn retrieve_key_returns_stub_jwk_after_one_call() {
    let fixture = TestFixture::new();
    let client = fixture.client(KmsConfig::default());
    fixture.broker.push_response(KmsResponse {
        key: Some(WireKey {
            uri: None,
            jwk: json!({ "mockKey": "data" }),
            resource_uri: None,
        }),
        uri: Some("test-key-uri".into()),
        ..KmsResponse::with_status(200)
    });

    let key = client
        .retrieve_key(
            &KeyUri::new("kms://test-kms.com/keys/test-key"),
            RequestOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(key.jwk["mockKey"], "data");
    assert_eq!(key.uri.as_str(), "test-key-uri");
    assert_eq!(fixture.broker.call_count(), 1);
}

#[tokio::test]
async fn migrated_key_is_followed_once() {
    let fixture = TestFixture::new();
    let client = fixture.client(KmsConfig::default());
    let old = fixture.key_uri("old");
    let new = fixture.key_uri("new");
    fixture.broker.insert_key(&new, json!({ "k": "00" }));
    fixture.broker.migrate_key(&old, &new);

    let key = client
        .retrieve_key(&KeyUri::new(&old), RequestOptions::on_behalf_of("user-7"))
        .await
        .unwrap();
    assert_eq!(key.uri.as_str(), new);

    let calls = fixture.broker.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].request.method, KmsMethod::Retrieve);
    assert_eq!(calls[1].request.uri, new);
    assert_eq!(calls[0].options, calls[1].options);
    assert_eq!(
        calls[1].options.as_ref().and_then(|o| o.on_behalf_of.as_deref()),
        Some("user-7")
    );
}

#[tokio::test]
async fn chained_migration_stops_after_one_hop() {
    let fixture = TestFixture::new();
    let client = fixture.client(KmsConfig::default());
    let a = fixture.key_uri("a");
    let b = fixture.key_uri("b");
    let c = fixture.key_uri("c");
    fixture.broker.insert_key(&c, json!({}));
    fixture.broker.migrate_key(&a, &b);
    fixture.broker.migrate_key(&b, &c);

    let err = client
        .retrieve_key(&KeyUri::new(&a), RequestOptions::default())
        .await
        .unwrap_err();

    let kms = err.as_kms_error().unwrap();
    assert_eq!(kms.error_code(), codes::KEY_MIGRATED);
    assert_eq!(fixture.broker.call_count(), 2);
}

#[tokio::test]
async fn cached_key_skips_the_broker() {
    let fixture = TestFixture::new();
    let client = fixture.client(KmsConfig::default());
    let uri = KeyUri::new(fixture.key_uri("cached"));
    fixture.broker.insert_key(uri.as_str(), json!({ "k": "01" }));

    for _ in 0..3 {
        client
            .retrieve_key(&uri, RequestOptions::default())
            .await
            .unwrap();
    }
    assert_eq!(fixture.broker.call_count(), 1);

    // requests on behalf of a user always reach the broker
    client
        .retrieve_key(&uri, RequestOptions::on_behalf_of("someone"))
        .await
        .unwrap();
    assert_eq!(fixture.broker.call_count(), 2);
}

proptest! {
    #[test]
    fn blank_uri_never_reaches_broker(options in request_options()) {
        let fixture = TestFixture::new();
        let client = fixture.client(KmsConfig::default());

        let err = runtime()
            .block_on(client.retrieve_key(&KeyUri::new(""), options))
            .unwrap_err();

        prop_assert!(matches!(err, ClientError::MissingParameter("options.uri")));
        prop_assert_eq!(err.to_string(), "`options.uri` is required");
        prop_assert_eq!(fixture.broker.call_count(), 0);
    }

    #[test]
    fn redirect_makes_exactly_one_extra_call(
        requested in key_uri(),
        target in key_uri(),
        options in request_options(),
    ) {
        let fixture = TestFixture::new();
        let client = fixture.client(KmsConfig::default());
        fixture.broker.push_response(
            KmsResponse::failure(301, codes::KEY_MIGRATED, "moved").redirect_to(target.as_str()),
        );
        fixture.broker.push_response(KmsResponse::with_key(WireKey::new(target.as_str(), json!({}))));

        let key = runtime()
            .block_on(client.retrieve_key(&requested, options.clone()))
            .unwrap();

        let calls = fixture.broker.calls();
        prop_assert_eq!(calls.len(), 2);
        prop_assert_eq!(&calls[1].request.uri, target.as_str());
        prop_assert_eq!(&calls[1].options, &options.into_option());
        prop_assert_eq!(key.uri, target);
    }

    #[test]
    fn non_migration_errors_make_one_call(code in 400_000u32..600_000, status in 400u16..600) {
        prop_assume!(code != codes::KEY_MIGRATED);
        let fixture = TestFixture::new();
        let client = fixture.client(KmsConfig::default());
        fixture.broker.push_failure(
            KmsResponse::failure(status, code, "nope").redirect_to("kms://elsewhere/keys/x"),
        );

        let err = runtime()
            .block_on(client.retrieve_key(&KeyUri::new("kms://h/keys/k"), RequestOptions::default()))
            .unwrap_err();

        prop_assert_eq!(err.as_kms_error().map(|e| e.error_code()), Some(code));
        prop_assert_eq!(fixture.broker.call_count(), 1);
    }
}
