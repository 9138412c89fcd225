use std::time::Duration;

/// Paths on the Dify service API
pub const CHAT_MESSAGES_PATH: &str = "/chat-messages";
pub const MESSAGES_PATH: &str = "/messages";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a Dify-compatible backend
#[derive(Debug, Clone)]
pub struct DifyConfig {
    /// Base URL including the version prefix, e.g. `https://api.dify.ai/v1`
    pub api_url: String,
    pub api_key: String,
    /// Applies to non-streaming calls; streams are bounded by the caller
    pub timeout: Duration,
}

impl DifyConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}
