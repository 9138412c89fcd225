//! Identity provider admin API: listing users and suspending accounts.

mod gotrue;
mod users;

pub use gotrue::GoTrueAdminClient;
pub use users::{
    AdminUser, SortBy, SortOrder, StatusFilter, UserListParams, UserListQuery, UserPage,
    UserStatus, UserSummary,
};

use async_trait::async_trait;
use thiserror::Error;

/// Ban length that the provider treats as permanent (about 100 years)
pub const PERMANENT_BAN: &str = "876000h";
/// Ban length that lifts an existing ban
pub const NO_BAN: &str = "none";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Every user known to the provider
    async fn list_all_users(&self) -> Result<Vec<AdminUser>, IdentityError>;

    /// Set `ban_duration` on a user and return the updated record
    async fn set_ban(&self, user_id: &str, ban_duration: &str) -> Result<AdminUser, IdentityError>;
}
