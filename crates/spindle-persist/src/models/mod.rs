mod thread;

pub use thread::{now_millis, NewThread, Thread, ThreadPatch};
