use serde::Deserialize;

use crate::error::{ChatError, Result};

/// Kind of a Dify stream event, read from the payload's `event` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEventKind {
    /// Incremental answer chunk
    Message,
    /// Incremental answer chunk from an agent app
    AgentMessage,
    /// End-of-message marker
    MessageEnd,
    Error,
    Ping,
    Other(String),
}

impl ChatEventKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "message" => Self::Message,
            "agent_message" => Self::AgentMessage,
            "message_end" => Self::MessageEnd,
            "error" => Self::Error,
            "ping" => Self::Ping,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One SSE frame from the backend.
///
/// `data` is the payload exactly as received so it can be relayed without
/// re-serialization; only the routing fields are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub kind: ChatEventKind,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub data: String,
}

#[derive(Deserialize)]
struct EventTag {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
}

impl ChatEvent {
    pub fn from_data(data: impl Into<String>) -> Result<Self> {
        let data = data.into();
        let tag: EventTag = serde_json::from_str(&data)?;
        let kind = tag
            .event
            .as_deref()
            .map(ChatEventKind::from_tag)
            .ok_or_else(|| ChatError::Stream("event payload without `event` field".to_string()))?;

        Ok(Self {
            kind,
            conversation_id: tag.conversation_id.filter(|c| !c.is_empty()),
            message_id: tag.message_id,
            data,
        })
    }

    /// True for events after which the backend sends nothing more
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ChatEventKind::MessageEnd | ChatEventKind::Error)
    }
}
