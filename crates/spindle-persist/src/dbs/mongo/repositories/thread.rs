use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};

use crate::dbs::mongo::models::MongoThread;
use crate::error::{PersistError, Result};
use crate::models::{now_millis, ThreadPatch};

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(database: &Database) -> Self {
        let collection = database.collection("threads");
        Self { collection }
    }

    /// Create the unique and lookup indexes the thread queries rely on
    pub async fn ensure_indexes(&self) -> Result<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "conversation_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_threads_conversation_id".to_string())
                        .unique(true)
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "updated_at": -1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_threads_user_id".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "archived": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_threads_user_archived".to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        Ok(())
    }

    /// Insert a thread, mapping a unique violation to `DuplicateConversationId`
    pub async fn insert_thread(&self, thread: &MongoThread) -> Result<()> {
        match self.collection.insert_one(thread).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(PersistError::DuplicateConversationId(
                thread.conversation_id.clone(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Get thread by ID, scoped to its owner
    pub async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<MongoThread>> {
        let filter = owned(user_id, thread_id);
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn find_by_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<MongoThread>> {
        let filter = doc! { "user_id": user_id, "conversation_id": conversation_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// List threads for a user
    pub async fn list_threads(&self, user_id: &str) -> Result<Vec<MongoThread>> {
        let filter = doc! { "user_id": user_id };
        let threads = self
            .collection
            .find(filter)
            .sort(doc! { "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(threads)
    }

    /// Set only the supplied fields and refresh `updated_at`
    pub async fn update_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        patch: &ThreadPatch,
    ) -> Result<Option<MongoThread>> {
        let mut set = Document::new();
        // Pipeline stages evaluate strings, so user text goes through $literal
        if let Some(title) = &patch.title {
            set.insert("title", doc! { "$literal": title.clone() });
        }
        if let Some(preview) = &patch.last_message_preview {
            set.insert("last_message_preview", doc! { "$literal": preview.clone() });
        }
        set.insert("updated_at", touched_at());

        let thread = self
            .collection
            .find_one_and_update(owned(user_id, thread_id), vec![doc! { "$set": set }])
            .return_document(ReturnDocument::After)
            .await?;
        Ok(thread)
    }

    /// Flip `archived` server-side with an aggregation-pipeline update
    pub async fn toggle_archived(
        &self,
        user_id: &str,
        thread_id: &str,
    ) -> Result<Option<MongoThread>> {
        let pipeline = vec![doc! {
            "$set": {
                "archived": { "$not": ["$archived"] },
                "updated_at": touched_at(),
            }
        }];

        let thread = self
            .collection
            .find_one_and_update(owned(user_id, thread_id), pipeline)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(thread)
    }

    /// Delete thread
    pub async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(owned(user_id, thread_id))
            .await?;
        Ok(result.deleted_count > 0)
    }
}

/// `updated_at` moves to now, or 1ms past its stored value when the clock
/// has not advanced, matching `Thread::touch`
fn touched_at() -> Document {
    doc! {
        "$max": [
            bson::DateTime::from_chrono(now_millis()),
            { "$add": ["$updated_at", 1] },
        ]
    }
}

fn owned(user_id: &str, thread_id: &str) -> Document {
    doc! { "_id": thread_id, "user_id": user_id }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}
