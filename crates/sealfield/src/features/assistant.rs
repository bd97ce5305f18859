//! AI assistant exchanges.

use serde::{Deserialize, Serialize};

use sealfield_codec::{Encryptable, Field, FieldSpec};
use sealfield_core::KeyUri;

/// A question sent to the assistant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<KeyUri>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// The assistant's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<AssistantMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<KeyUri>,
}

fn query(request: &mut AssistantRequest) -> Option<&mut String> {
    request.query.as_mut()
}

fn message_values(response: &mut AssistantResponse) -> Vec<&mut String> {
    response
        .messages
        .iter_mut()
        .filter_map(|message| message.value.as_mut())
        .collect()
}

impl Encryptable for AssistantRequest {
    fn field_spec() -> FieldSpec<Self> {
        FieldSpec::new(vec![Field::scalar("query", query)])
    }

    fn encryption_key_url(&self) -> Option<&KeyUri> {
        self.encryption_key_url.as_ref()
    }

    fn set_encryption_key_url(&mut self, uri: KeyUri) {
        self.encryption_key_url = Some(uri);
    }
}

impl Encryptable for AssistantResponse {
    fn field_spec() -> FieldSpec<Self> {
        FieldSpec::new(vec![Field::each("messages[].value", message_values)])
    }

    fn encryption_key_url(&self) -> Option<&KeyUri> {
        self.encryption_key_url.as_ref()
    }

    fn set_encryption_key_url(&mut self, uri: KeyUri) {
        self.encryption_key_url = Some(uri);
    }
}
