//! Wire shapes of the feature records.
//!
//! Records travel to and from the service as camelCase JSON. Encryption only
//! rewrites string values in place, so the shape must survive untouched.

use sealfield::{Activity, AssistantResponse, KeyUri, Task};
use serde_json::json;

#[test]
fn task_from_service_json() {
    let task: Task = serde_json::from_value(json!({
        "id": "t-1",
        "title": "c1",
        "notes": "c2",
        "dueDate": "2024-05-01",
        "encryptionKeyUrl": "kms://kms.example.com/keys/abc",
    }))
    .unwrap();

    assert_eq!(task.id, "t-1");
    assert_eq!(task.due_date.as_deref(), Some("2024-05-01"));
    assert_eq!(
        task.encryption_key_url,
        Some(KeyUri::new("kms://kms.example.com/keys/abc"))
    );
    assert_eq!(task.status, None);
}

#[test]
fn activity_files_round_trip_as_camel_case() {
    let value = json!({
        "verb": "share",
        "displayName": "x",
        "files": [
            { "displayName": "a.txt", "fileSize": 3 },
            { "url": "https://files/b" },
        ],
    });

    let activity: Activity = serde_json::from_value(value.clone()).unwrap();
    assert_eq!(activity.files.len(), 2);
    assert_eq!(activity.files[1].display_name, None);
    assert_eq!(serde_json::to_value(&activity).unwrap(), value);
}

#[test]
fn assistant_response_without_key_url() {
    let response: AssistantResponse = serde_json::from_value(json!({
        "messages": [{ "value": "hi", "format": "text" }],
    }))
    .unwrap();

    assert_eq!(response.encryption_key_url, None);
    assert_eq!(response.messages[0].value.as_deref(), Some("hi"));
}
