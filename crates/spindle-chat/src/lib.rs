pub mod buffer_utils;
pub mod config;
pub mod dify;
pub mod error;
pub mod streaming;
pub mod traits;
pub mod types;

pub use config::DifyConfig;
pub use dify::DifyClient;
pub use error::ChatError;
pub use streaming::{ChatEvent, ChatEventKind};
pub use traits::{ChatBackend, ChatStream};
pub use types::{ChatMessageRequest, HistoryMessage, HistoryQuery, MessageHistory, ResponseMode};
