use thiserror::Error;

use crate::error::ApiError;

/// Why a request could not be authenticated.
///
/// Clients only ever see `AUTH_REQUIRED`; the variant is for the logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid authorization header format")]
    InvalidAuthHeader,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(reason = %err, "rejecting unauthenticated request");
        ApiError::Unauthorized
    }
}
