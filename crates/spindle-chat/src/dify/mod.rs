mod client;

pub use client::DifyClient;
