use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::identity::IdentityError;
use crate::validation::FieldError;
use spindle_chat::ChatError;
use spindle_persist::PersistError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid request data")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Thread not found or access denied")]
    ThreadNotFound,

    #[error("Thread with this conversation ID already exists")]
    DuplicateConversation,

    #[error("Persistence error: {0}")]
    Persist(PersistError),

    #[error("Chat backend error: {0}")]
    Chat(#[from] ChatError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),
}

impl ApiError {
    /// Single-issue validation failure
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(path, message)])
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "AUTH_REQUIRED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Validation(_) | ApiError::BadRequest(_) => "VALIDATION_ERROR",
            ApiError::ThreadNotFound => "NOT_FOUND",
            ApiError::DuplicateConversation => "DUPLICATE_CONVERSATION_ID",
            ApiError::Persist(_) | ApiError::Chat(_) | ApiError::Identity(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ThreadNotFound => StatusCode::NOT_FOUND,
            ApiError::DuplicateConversation => StatusCode::CONFLICT,
            ApiError::Persist(_) | ApiError::Chat(_) | ApiError::Identity(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<PersistError> for ApiError {
    fn from(err: PersistError) -> Self {
        if err.is_duplicate() {
            ApiError::DuplicateConversation
        } else {
            ApiError::Persist(err)
        }
    }
}

/// Body of every non-2xx response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();

        // Server-side failures never leak their cause to the client
        let message = match &self {
            ApiError::Persist(e) => {
                tracing::error!("Persistence error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Chat(e) => {
                tracing::error!("Chat backend error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Identity(e) => {
                tracing::error!("Identity provider error: {}", e);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let details = match self {
            ApiError::Validation(issues) => Some(issues),
            _ => None,
        };

        let body = Json(ErrorBody {
            error: message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_persist_error_maps_to_conflict() {
        let err: ApiError = PersistError::DuplicateConversationId("conv-1".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "DUPLICATE_CONVERSATION_ID");
    }

    #[test]
    fn test_storage_failure_is_opaque() {
        let err: ApiError = PersistError::Connection("refused".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_upstream_failure_is_internal() {
        let err: ApiError = ChatError::Upstream {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
