use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
    validation::{FieldError, ValidJson, Validate, Validator},
};
use spindle_persist::{NewThread, Thread, ThreadPatch};

/// Body of `POST /threads`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    #[schema(min_length = 1)]
    pub conversation_id: String,
    pub title: Option<String>,
}

impl Validate for CreateThreadRequest {
    fn validate(body: &Map<String, Value>) -> Result<Self, Vec<FieldError>> {
        let mut v = Validator::new(body);
        let conversation_id = v.required_string("conversationId", 1);
        let title = v.optional_string("title");
        v.finish(conversation_id.map(|conversation_id| CreateThreadRequest {
            conversation_id,
            title,
        }))
    }
}

/// Body of `PATCH /threads/{id}`; omitted fields are left unchanged
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateThreadRequest {
    pub title: Option<String>,
    pub last_message_preview: Option<String>,
}

impl Validate for UpdateThreadRequest {
    fn validate(body: &Map<String, Value>) -> Result<Self, Vec<FieldError>> {
        let mut v = Validator::new(body);
        let title = v.optional_string("title");
        let last_message_preview = v.optional_string("lastMessagePreview");
        v.finish(Some(UpdateThreadRequest {
            title,
            last_message_preview,
        }))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResponse {
    pub id: Uuid,
    pub user_id: String,
    pub conversation_id: String,
    pub title: Option<String>,
    pub last_message_preview: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Thread> for ThreadResponse {
    fn from(thread: Thread) -> Self {
        Self {
            id: thread.id,
            user_id: thread.user_id,
            conversation_id: thread.conversation_id,
            title: thread.title,
            last_message_preview: thread.last_message_preview,
            archived: thread.archived,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadEnvelope {
    pub thread: ThreadResponse,
}

impl From<Thread> for ThreadEnvelope {
    fn from(thread: Thread) -> Self {
        Self {
            thread: thread.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadListResponse {
    pub threads: Vec<ThreadResponse>,
    pub count: usize,
}

/// Ids that are not UUIDs cannot name a thread, so they are simply not found
fn parse_thread_id(thread_id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(thread_id).map_err(|_| ApiError::ThreadNotFound)
}

/// List the caller's threads, most recently updated first
#[utoipa::path(
    get,
    path = "/threads",
    responses(
        (status = 200, description = "Caller's threads", body = ThreadListResponse),
        (status = 401, description = "Not signed in", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<ThreadListResponse>> {
    let threads: Vec<ThreadResponse> = state
        .store
        .list_threads(user.id())
        .await?
        .into_iter()
        .map(ThreadResponse::from)
        .collect();

    Ok(Json(ThreadListResponse {
        count: threads.len(),
        threads,
    }))
}

/// Create a thread linked to a chat backend conversation
#[utoipa::path(
    post,
    path = "/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 201, description = "Thread created", body = ThreadEnvelope),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 409, description = "Conversation already linked", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ValidJson(req): ValidJson<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<ThreadEnvelope>)> {
    let new_thread = NewThread {
        conversation_id: req.conversation_id,
        title: req.title,
    };

    let thread = state.store.create_thread(user.id(), new_thread).await?;
    tracing::info!(thread_id = %thread.id, user_id = %user.id(), "thread created");

    Ok((StatusCode::CREATED, Json(thread.into())))
}

/// Get one of the caller's threads
#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread details", body = ThreadEnvelope),
        (status = 404, description = "Thread not found or not owned", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadEnvelope>> {
    let thread_id = parse_thread_id(&thread_id)?;

    let thread = state
        .store
        .get_thread(user.id(), thread_id)
        .await?
        .ok_or(ApiError::ThreadNotFound)?;

    Ok(Json(thread.into()))
}

/// Rename a thread and/or update its last message preview
#[utoipa::path(
    patch,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = UpdateThreadRequest,
    responses(
        (status = 200, description = "Thread updated", body = ThreadEnvelope),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Thread not found or not owned", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
    ValidJson(req): ValidJson<UpdateThreadRequest>,
) -> ApiResult<Json<ThreadEnvelope>> {
    let thread_id = parse_thread_id(&thread_id)?;

    let patch = ThreadPatch {
        title: req.title,
        last_message_preview: req.last_message_preview,
    };

    let thread = state
        .store
        .update_thread(user.id(), thread_id, patch)
        .await?
        .ok_or(ApiError::ThreadNotFound)?;

    Ok(Json(thread.into()))
}

/// Flip the archived flag
#[utoipa::path(
    patch,
    path = "/threads/{thread_id}/archive",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Archive flag flipped", body = ThreadEnvelope),
        (status = 404, description = "Thread not found or not owned", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn toggle_archive(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadEnvelope>> {
    let thread_id = parse_thread_id(&thread_id)?;

    let thread = state
        .store
        .toggle_archived(user.id(), thread_id)
        .await?
        .ok_or(ApiError::ThreadNotFound)?;

    tracing::debug!(thread_id = %thread.id, archived = thread.archived, "archive toggled");
    Ok(Json(thread.into()))
}

/// Delete a thread permanently
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 204, description = "Thread deleted"),
        (status = 404, description = "Thread not found or not owned", body = ErrorBody)
    ),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    let thread_id = parse_thread_id(&thread_id)?;

    if !state.store.delete_thread(user.id(), thread_id).await? {
        return Err(ApiError::ThreadNotFound);
    }

    tracing::info!(thread_id = %thread_id, user_id = %user.id(), "thread deleted");
    Ok(StatusCode::NO_CONTENT)
}
