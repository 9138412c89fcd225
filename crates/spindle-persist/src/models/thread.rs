use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Database-agnostic thread model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub user_id: String,
    pub conversation_id: String,
    pub title: Option<String>,
    pub last_message_preview: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Build a fresh, unarchived thread owned by `user_id`.
    pub fn new(user_id: impl Into<String>, new_thread: NewThread) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            conversation_id: new_thread.conversation_id,
            // An empty title is the same as no title
            title: new_thread.title.filter(|t| !t.is_empty()),
            last_message_preview: None,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place. `updated_at` is always refreshed.
    pub fn apply(&mut self, patch: &ThreadPatch) {
        if let Some(title) = &patch.title {
            self.title = Some(title.clone());
        }
        if let Some(preview) = &patch.last_message_preview {
            self.last_message_preview = Some(preview.clone());
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        let now = now_millis();
        // Keep updated_at strictly monotonic per thread within one millisecond
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::milliseconds(1)
        };
    }
}

/// Wall clock at the millisecond precision BSON dates keep, so a thread
/// reads back exactly as it was returned on create
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Input for thread creation
#[derive(Debug, Clone, Default)]
pub struct NewThread {
    pub conversation_id: String,
    pub title: Option<String>,
}

impl NewThread {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Partial update: `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadPatch {
    pub title: Option<String>,
    pub last_message_preview: Option<String>,
}
