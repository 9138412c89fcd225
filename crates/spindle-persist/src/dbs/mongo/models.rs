use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PersistError;
use crate::models::Thread;

/// MongoDB-specific Thread model (UUID stored as its string form in `_id`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub title: Option<String>,
    pub last_message_preview: Option<String>,
    pub archived: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

// Conversions between database-agnostic and MongoDB-specific models

impl From<&Thread> for MongoThread {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id.to_string(),
            user_id: thread.user_id.clone(),
            conversation_id: thread.conversation_id.clone(),
            title: thread.title.clone(),
            last_message_preview: thread.last_message_preview.clone(),
            archived: thread.archived,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

impl TryFrom<MongoThread> for Thread {
    type Error = PersistError;

    fn try_from(thread: MongoThread) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&thread.id).map_err(|e| PersistError::CorruptRecord {
            id: thread.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            id,
            user_id: thread.user_id,
            conversation_id: thread.conversation_id,
            title: thread.title,
            last_message_preview: thread.last_message_preview,
            archived: thread.archived,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewThread;

    #[test]
    fn test_thread_roundtrip_through_mongo_model() {
        let thread = Thread::new("user-1", NewThread::new("conv-1").with_title("t"));
        let mongo = MongoThread::from(&thread);
        assert_eq!(mongo.id, thread.id.to_string());

        let back = Thread::try_from(mongo).unwrap();
        assert_eq!(back.id, thread.id);
        assert_eq!(back.conversation_id, "conv-1");
    }

    #[test]
    fn test_corrupt_id_is_rejected() {
        let thread = Thread::new("user-1", NewThread::new("conv-1"));
        let mut mongo = MongoThread::from(&thread);
        mongo.id = "not-a-uuid".to_string();

        let err = Thread::try_from(mongo).unwrap_err();
        assert!(matches!(err, PersistError::CorruptRecord { .. }));
    }
}
