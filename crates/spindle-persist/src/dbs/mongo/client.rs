use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use uuid::Uuid;

use crate::dbs::mongo::models::MongoThread;
use crate::dbs::mongo::repositories::MongoThreadRepository;
use crate::error::{PersistError, Result};
use crate::models::{NewThread, Thread, ThreadPatch};
use crate::trait_client::ThreadStore;

/// Connection tuning for [`MongoThreadStore::connect`]
#[derive(Debug, Clone)]
pub struct MongoOptions {
    pub pool_size: u32,
    pub timeout: Duration,
}

impl Default for MongoOptions {
    fn default() -> Self {
        Self {
            pool_size: 10,
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct MongoThreadStore {
    database: Database,
    thread_repo: MongoThreadRepository,
}

impl MongoThreadStore {
    /// Connect to MongoDB, then make sure the thread indexes exist
    pub async fn connect(mongodb_uri: &str, database: &str, options: MongoOptions) -> Result<Self> {
        let mut client_options = ClientOptions::parse(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;
        client_options.max_pool_size = Some(options.pool_size);
        client_options.server_selection_timeout = Some(options.timeout);
        client_options.connect_timeout = Some(options.timeout);

        let client = Client::with_options(client_options)
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let database = client.database(database);
        let thread_repo = MongoThreadRepository::new(&database);
        thread_repo.ensure_indexes().await?;

        tracing::debug!(database = %database.name(), "thread indexes ensured");

        Ok(Self {
            database,
            thread_repo,
        })
    }
}

fn into_thread(thread: Option<MongoThread>) -> Result<Option<Thread>> {
    thread.map(Thread::try_from).transpose()
}

#[async_trait]
impl ThreadStore for MongoThreadStore {
    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        let mongo_threads = self.thread_repo.list_threads(user_id).await?;
        mongo_threads.into_iter().map(Thread::try_from).collect()
    }

    async fn create_thread(&self, user_id: &str, new_thread: NewThread) -> Result<Thread> {
        let thread = Thread::new(user_id, new_thread);
        self.thread_repo
            .insert_thread(&MongoThread::from(&thread))
            .await?;
        Ok(thread)
    }

    async fn get_thread(&self, user_id: &str, thread_id: Uuid) -> Result<Option<Thread>> {
        let thread = self
            .thread_repo
            .get_thread(user_id, &thread_id.to_string())
            .await?;
        into_thread(thread)
    }

    async fn find_by_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Option<Thread>> {
        let thread = self
            .thread_repo
            .find_by_conversation(user_id, conversation_id)
            .await?;
        into_thread(thread)
    }

    async fn update_thread(
        &self,
        user_id: &str,
        thread_id: Uuid,
        patch: ThreadPatch,
    ) -> Result<Option<Thread>> {
        let thread = self
            .thread_repo
            .update_thread(user_id, &thread_id.to_string(), &patch)
            .await?;
        into_thread(thread)
    }

    async fn toggle_archived(&self, user_id: &str, thread_id: Uuid) -> Result<Option<Thread>> {
        let thread = self
            .thread_repo
            .toggle_archived(user_id, &thread_id.to_string())
            .await?;
        into_thread(thread)
    }

    async fn delete_thread(&self, user_id: &str, thread_id: Uuid) -> Result<bool> {
        self.thread_repo
            .delete_thread(user_id, &thread_id.to_string())
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
