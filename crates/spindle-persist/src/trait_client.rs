use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewThread, Thread, ThreadPatch};

/// Ownership-scoped thread storage
///
/// Every method takes the caller's `user_id` and only ever sees rows owned by
/// it. "Missing" and "owned by someone else" both come back as `None`/`false`.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// All threads owned by the user, most recently updated first
    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>>;

    /// Insert a new thread. Fails with `DuplicateConversationId` when the
    /// conversation is already linked to any thread.
    async fn create_thread(&self, user_id: &str, new_thread: NewThread) -> Result<Thread>;

    /// Get a thread by ID
    async fn get_thread(&self, user_id: &str, thread_id: Uuid) -> Result<Option<Thread>>;

    /// Find the user's thread linked to an external conversation
    async fn find_by_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<Thread>>;

    /// Apply a partial update and return the updated thread
    async fn update_thread(
        &self,
        user_id: &str,
        thread_id: Uuid,
        patch: ThreadPatch,
    ) -> Result<Option<Thread>>;

    /// Flip `archived` in a single storage operation and return the result
    async fn toggle_archived(&self, user_id: &str, thread_id: Uuid) -> Result<Option<Thread>>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_thread(&self, user_id: &str, thread_id: Uuid) -> Result<bool>;

    /// Cheap round-trip used by the health endpoint
    async fn ping(&self) -> Result<()>;
}
