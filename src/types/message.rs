//! Chat message types

use serde::{Deserialize, Serialize};

/// A chat message as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body of a message-send request. `content` is already trimmed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage<'a> {
    pub content: &'a str,
    pub conversation_id: &'a str,
    pub sender_id: &'a str,
}

/// Error body returned by the write path. May be absent entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WriteErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
