use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::buffer_utils::parse_event_stream;
use crate::config::{DifyConfig, CHAT_MESSAGES_PATH, MESSAGES_PATH};
use crate::error::{ChatError, Result};
use crate::traits::{ChatBackend, ChatStream};
use crate::types::{ChatMessageRequest, HistoryQuery, MessageHistory};

/// Dify service API client (HTTP direct, no SDK)
pub struct DifyClient {
    http_client: reqwest::Client,
    config: DifyConfig,
}

impl DifyClient {
    pub fn new(config: DifyConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ChatError::Config("API key must not be empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| ChatError::Config("Invalid API key format".to_string()))?,
        );

        // No client-wide timeout: it would also cut long-running streams.
        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "chat backend rejected request");
        Err(ChatError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ChatBackend for DifyClient {
    async fn send_message(&self, request: ChatMessageRequest) -> Result<ChatStream> {
        tracing::debug!(
            user = %request.user,
            conversation_id = ?request.conversation_id,
            "sending chat message"
        );

        let response = self
            .http_client
            .post(self.config.endpoint(CHAT_MESSAGES_PATH))
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(parse_event_stream(response.bytes_stream()))
    }

    async fn get_messages(&self, query: HistoryQuery) -> Result<MessageHistory> {
        let response = self
            .http_client
            .get(self.config.endpoint(MESSAGES_PATH))
            .query(&query)
            .timeout(self.config.timeout)
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
