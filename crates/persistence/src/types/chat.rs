//! Chat history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::text_enum;

text_enum! {
    /// Who wrote a chat message.
    ChatRole ("chat role") {
        User => "user",
        Assistant => "assistant",
        System => "system",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    /// Session the message was written under, if any.
    pub session_id: Option<String>,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub session_id: Option<String>,
    pub role: ChatRole,
    pub content: String,
}
