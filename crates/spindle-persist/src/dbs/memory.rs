use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PersistError, Result};
use crate::models::{NewThread, Thread, ThreadPatch};
use crate::trait_client::ThreadStore;

/// Process-local store backed by a `HashMap`.
///
/// Used for local development without MongoDB and as the store behind the
/// API integration tests. The uniqueness of `conversation_id` is enforced
/// under the same write lock as the insert.
#[derive(Default)]
pub struct InMemoryThreadStore {
    threads: RwLock<HashMap<Uuid, Thread>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored threads across all users
    pub async fn len(&self) -> usize {
        self.threads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.threads.read().await.is_empty()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        let threads = self.threads.read().await;
        let mut owned: Vec<Thread> = threads
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned)
    }

    async fn create_thread(&self, user_id: &str, new_thread: NewThread) -> Result<Thread> {
        let mut threads = self.threads.write().await;

        if threads
            .values()
            .any(|t| t.conversation_id == new_thread.conversation_id)
        {
            return Err(PersistError::DuplicateConversationId(
                new_thread.conversation_id,
            ));
        }

        let thread = Thread::new(user_id, new_thread);
        threads.insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn get_thread(&self, user_id: &str, thread_id: Uuid) -> Result<Option<Thread>> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(&thread_id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn find_by_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<Thread>> {
        let threads = self.threads.read().await;
        Ok(threads
            .values()
            .find(|t| t.user_id == user_id && t.conversation_id == conversation_id)
            .cloned())
    }

    async fn update_thread(
        &self,
        user_id: &str,
        thread_id: Uuid,
        patch: ThreadPatch,
    ) -> Result<Option<Thread>> {
        let mut threads = self.threads.write().await;
        Ok(threads
            .get_mut(&thread_id)
            .filter(|t| t.user_id == user_id)
            .map(|thread| {
                thread.apply(&patch);
                thread.clone()
            }))
    }

    async fn toggle_archived(&self, user_id: &str, thread_id: Uuid) -> Result<Option<Thread>> {
        let mut threads = self.threads.write().await;
        Ok(threads
            .get_mut(&thread_id)
            .filter(|t| t.user_id == user_id)
            .map(|thread| {
                thread.archived = !thread.archived;
                thread.touch();
                thread.clone()
            }))
    }

    async fn delete_thread(&self, user_id: &str, thread_id: Uuid) -> Result<bool> {
        let mut threads = self.threads.write().await;
        let owned = threads
            .get(&thread_id)
            .is_some_and(|t| t.user_id == user_id);
        if owned {
            threads.remove(&thread_id);
        }
        Ok(owned)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
