pub mod thread;

pub use thread::MongoThreadRepository;
