//! Tasks.

use serde::{Deserialize, Serialize};

use sealfield_codec::{Encryptable, Field, FieldSpec};
use sealfield_core::KeyUri;

/// A task as sent to the service when creating or updating it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<KeyUri>,
}

/// A task as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<KeyUri>,
}

fn request_title(task: &mut TaskRequest) -> Option<&mut String> {
    task.title.as_mut()
}

fn request_notes(task: &mut TaskRequest) -> Option<&mut String> {
    task.notes.as_mut()
}

fn title(task: &mut Task) -> Option<&mut String> {
    task.title.as_mut()
}

fn notes(task: &mut Task) -> Option<&mut String> {
    task.notes.as_mut()
}

impl Encryptable for TaskRequest {
    fn field_spec() -> FieldSpec<Self> {
        FieldSpec::new(vec![
            Field::scalar("title", request_title),
            Field::scalar("notes", request_notes),
        ])
    }

    fn encryption_key_url(&self) -> Option<&KeyUri> {
        self.encryption_key_url.as_ref()
    }

    fn set_encryption_key_url(&mut self, uri: KeyUri) {
        self.encryption_key_url = Some(uri);
    }
}

impl Encryptable for Task {
    fn field_spec() -> FieldSpec<Self> {
        FieldSpec::new(vec![Field::scalar("title", title), Field::scalar("notes", notes)])
    }

    fn encryption_key_url(&self) -> Option<&KeyUri> {
        self.encryption_key_url.as_ref()
    }

    fn set_encryption_key_url(&mut self, uri: KeyUri) {
        self.encryption_key_url = Some(uri);
    }
}
