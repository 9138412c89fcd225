use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Thread with conversation ID already exists: {0}")]
    DuplicateConversationId(String),

    #[error("Corrupt thread record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("Connection error: {0}")]
    Connection(String),
}

impl PersistError {
    /// True when the failure is a uniqueness violation on `conversation_id`.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PersistError::DuplicateConversationId(_))
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
