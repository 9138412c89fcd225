use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::streaming::ChatEvent;
use crate::types::{ChatMessageRequest, HistoryQuery, MessageHistory};

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatEvent>> + Send>>;

/// A conversational backend that streams answers and keeps per-conversation
/// history.
///
/// Callers are responsible for checking that the end user owns the
/// conversation before calling either method.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a query and stream the answer back.
    ///
    /// Fails before the first event when the backend rejects the request;
    /// later failures arrive as `Err` items on the stream.
    async fn send_message(&self, request: ChatMessageRequest) -> Result<ChatStream>;

    /// Fetch one page of a conversation's history
    async fn get_messages(&self, query: HistoryQuery) -> Result<MessageHistory>;
}
