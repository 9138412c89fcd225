pub mod dbs;
pub mod error;
pub mod models;
pub mod trait_client;

pub use dbs::memory::InMemoryThreadStore;
#[cfg(feature = "mongodb")]
pub use dbs::mongo::{MongoOptions, MongoThreadStore};
pub use error::PersistError;
pub use models::{NewThread, Thread, ThreadPatch};
pub use trait_client::ThreadStore;
