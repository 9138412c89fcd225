//! Session guard: resolves the caller's identity from a signed session token.

mod claims;
mod error;
mod session;

pub use claims::{AppMetadata, Claims, UserMetadata};
pub use error::AuthError;
pub use session::{CurrentUser, RequireAdmin, SessionGuard};
