//! Conversation activities.

use serde::{Deserialize, Serialize};

use sealfield_codec::{Encryptable, Field, FieldSpec};
use sealfield_core::KeyUri;

/// A file shared in a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// A message or share posted to a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ActivityFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<KeyUri>,
}

fn display_name(activity: &mut Activity) -> Option<&mut String> {
    activity.display_name.as_mut()
}

fn content(activity: &mut Activity) -> Option<&mut String> {
    activity.content.as_mut()
}

fn file_names(activity: &mut Activity) -> Vec<&mut String> {
    activity
        .files
        .iter_mut()
        .filter_map(|file| file.display_name.as_mut())
        .collect()
}

impl Encryptable for Activity {
    fn field_spec() -> FieldSpec<Self> {
        FieldSpec::new(vec![
            Field::scalar("displayName", display_name),
            Field::scalar("content", content),
            Field::each("files[].displayName", file_names),
        ])
    }

    fn encryption_key_url(&self) -> Option<&KeyUri> {
        self.encryption_key_url.as_ref()
    }

    fn set_encryption_key_url(&mut self, uri: KeyUri) {
        self.encryption_key_url = Some(uri);
    }
}
