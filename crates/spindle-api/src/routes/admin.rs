use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::RequireAdmin,
    error::{ApiError, ApiResult},
    identity::{AdminUser, UserListParams, UserListQuery, UserPage, NO_BAN, PERMANENT_BAN},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserActionResponse {
    pub success: bool,
    pub user: AdminUser,
}

/// List users with search, status filter, sorting and paging
#[utoipa::path(
    get,
    path = "/admin/users",
    params(
        ("page" = Option<usize>, Query, description = "Page number (default 1)"),
        ("limit" = Option<usize>, Query, description = "Page size (default 20, max 100)"),
        ("search" = Option<String>, Query, description = "Substring of email or username"),
        ("sortBy" = Option<String>, Query, description = "created_at | email"),
        ("sortOrder" = Option<String>, Query, description = "asc | desc"),
        ("status" = Option<String>, Query, description = "all | active | suspended | pending")
    ),
    responses(
        (status = 200, description = "One page of users", body = UserPage),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> ApiResult<Json<UserPage>> {
    let Query(query) = query.map_err(|e| ApiError::invalid("query", e.body_text()))?;
    let params = UserListParams::try_from(query).map_err(ApiError::Validation)?;

    let users = state.identity.list_all_users().await?;
    Ok(Json(params.apply(users)))
}

/// Suspend a user indefinitely
#[utoipa::path(
    post,
    path = "/admin/users/{user_id}/suspend",
    params(
        ("user_id" = String, Path, description = "User ID (UUID)")
    ),
    responses(
        (status = 200, description = "User suspended", body = UserActionResponse),
        (status = 400, description = "Malformed user id", body = ErrorBody),
        (status = 403, description = "Not an admin, or own account", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn suspend_user(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserActionResponse>> {
    let target = target_user(&user_id, admin.id(), "Cannot suspend your own account")?;

    let user = state.identity.set_ban(&target, PERMANENT_BAN).await?;
    tracing::info!(admin_id = %admin.id(), target_user_id = %target, "user suspended");

    Ok(Json(UserActionResponse {
        success: true,
        user,
    }))
}

/// Lift a suspension
#[utoipa::path(
    post,
    path = "/admin/users/{user_id}/unsuspend",
    params(
        ("user_id" = String, Path, description = "User ID (UUID)")
    ),
    responses(
        (status = 200, description = "User unsuspended", body = UserActionResponse),
        (status = 400, description = "Malformed user id", body = ErrorBody),
        (status = 403, description = "Not an admin, or own account", body = ErrorBody)
    ),
    tag = "admin"
)]
pub async fn unsuspend_user(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserActionResponse>> {
    let target = target_user(&user_id, admin.id(), "Cannot unsuspend your own account")?;

    let user = state.identity.set_ban(&target, NO_BAN).await?;
    tracing::info!(admin_id = %admin.id(), target_user_id = %target, "user unsuspended");

    Ok(Json(UserActionResponse {
        success: true,
        user,
    }))
}

/// Normalized target id; admins may not act on themselves
fn target_user(user_id: &str, admin_id: &str, self_message: &str) -> ApiResult<String> {
    let target = Uuid::parse_str(user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user ID format".to_string()))?
        .to_string();

    let is_self = Uuid::parse_str(admin_id)
        .map(|admin| admin.to_string() == target)
        .unwrap_or(admin_id == target);

    if is_self {
        return Err(ApiError::Forbidden(self_message.to_string()));
    }

    Ok(target)
}
