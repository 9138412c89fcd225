pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

pub use routes::build_router;
