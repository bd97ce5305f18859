//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sealfield::features::{Activity, ActivityFile, TaskRequest};
use sealfield_core::KeyUri;
use sealfield_kms::RequestOptions;

/// A broker-style key URI.
pub fn key_uri() -> impl Strategy<Value = KeyUri> {
    ("[a-z]{1,8}", "[0-9a-f]{8,16}")
        .prop_map(|(host, id)| KeyUri::new(format!("kms://{host}.test/keys/{id}")))
}

/// Request options, with or without an `onBehalfOf` user.
pub fn request_options() -> impl Strategy<Value = RequestOptions> {
    prop::option::of("[a-z0-9-]{1,12}").prop_map(|on_behalf_of| RequestOptions { on_behalf_of })
}

/// Arbitrary text, including the empty string.
pub fn text() -> impl Strategy<Value = String> {
    ".{0,40}"
}

/// Optional field text.
pub fn field() -> impl Strategy<Value = Option<String>> {
    prop::option::of(text())
}

pub fn task_request() -> impl Strategy<Value = TaskRequest> {
    (field(), field(), field(), field()).prop_map(|(title, notes, due_date, status)| TaskRequest {
        title,
        notes,
        due_date,
        status,
        encryption_key_url: None,
    })
}

pub fn activity_file() -> impl Strategy<Value = ActivityFile> {
    (field(), field(), prop::option::of(any::<u64>())).prop_map(|(display_name, url, file_size)| {
        ActivityFile {
            display_name,
            url,
            file_size,
        }
    })
}

pub fn activity() -> impl Strategy<Value = Activity> {
    (
        field(),
        field(),
        field(),
        prop::collection::vec(activity_file(), 0..4),
    )
        .prop_map(|(verb, display_name, content, files)| Activity {
            id: None,
            verb,
            display_name,
            content,
            files,
            encryption_key_url: None,
        })
}
