use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
    validation::{FieldError, ValidJson, Validate, Validator},
};
use spindle_chat::{ChatMessageRequest, HistoryQuery, MessageHistory};

const DEFAULT_HISTORY_LIMIT: u32 = 20;
const MAX_HISTORY_LIMIT: u32 = 100;

/// Body of `POST /chat`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[schema(min_length = 1)]
    pub query: String,
    /// Continue an existing conversation; omit to start a new one
    pub conversation_id: Option<String>,
    /// App variables passed through to the chat backend
    #[schema(value_type = Option<Object>)]
    pub inputs: Option<Map<String, Value>>,
}

impl Validate for SendMessageRequest {
    fn validate(body: &Map<String, Value>) -> Result<Self, Vec<FieldError>> {
        let mut v = Validator::new(body);
        let query = v.required_string("query", 1);
        let conversation_id = v.optional_string("conversationId");
        let inputs = v.optional_object("inputs");
        v.finish(query.map(|query| SendMessageRequest {
            query,
            conversation_id: conversation_id.filter(|c| !c.is_empty()),
            inputs,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub conversation_id: Option<String>,
    pub first_id: Option<String>,
    pub limit: Option<String>,
}

impl HistoryParams {
    fn into_query(self, user_id: &str) -> ApiResult<HistoryQuery> {
        let mut issues = Vec::new();

        let conversation_id = self.conversation_id.filter(|c| !c.is_empty());
        if conversation_id.is_none() {
            issues.push(FieldError::new("conversation_id", "Required"));
        }

        let limit = match self.limit.as_deref() {
            None => DEFAULT_HISTORY_LIMIT,
            Some(raw) => match raw.parse::<u32>() {
                Ok(l) if (1..=MAX_HISTORY_LIMIT).contains(&l) => l,
                _ => {
                    issues.push(FieldError::new(
                        "limit",
                        format!("Must be an integer between 1 and {}", MAX_HISTORY_LIMIT),
                    ));
                    DEFAULT_HISTORY_LIMIT
                }
            },
        };

        match conversation_id {
            Some(conversation_id) if issues.is_empty() => Ok(HistoryQuery {
                conversation_id,
                user: user_id.to_string(),
                first_id: self.first_id.filter(|f| !f.is_empty()),
                limit: Some(limit),
            }),
            _ => Err(ApiError::Validation(issues)),
        }
    }
}

/// Fail closed: a conversation the caller has no thread for is not found
async fn ensure_owned(state: &AppState, user: &CurrentUser, conversation_id: &str) -> ApiResult<()> {
    state
        .store
        .find_by_conversation(user.id(), conversation_id)
        .await?
        .map(|_| ())
        .ok_or(ApiError::ThreadNotFound)
}

/// Frame sent when the upstream stream breaks after the response started
fn error_frame() -> Event {
    let payload = serde_json::json!({
        "event": "error",
        "status": 500,
        "code": "INTERNAL_ERROR",
        "message": "Internal server error",
    });
    Event::default().data(payload.to_string())
}

/// SSE fields cannot carry a CR; compact JSON escapes any inside strings
fn relay_data(data: String) -> String {
    if !data.contains('\r') {
        return data;
    }
    match serde_json::from_str::<Value>(&data) {
        Ok(value) => value.to_string(),
        Err(_) => data.replace('\r', ""),
    }
}

/// Send a message and relay the backend's answer as Server-Sent Events
///
/// Each upstream `data:` payload is forwarded unchanged. The stream closes
/// after `message_end` or `error`.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Streaming response", body = String, content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 404, description = "Conversation not owned by caller", body = ErrorBody)
    ),
    tag = "chat"
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ValidJson(req): ValidJson<SendMessageRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mut request = ChatMessageRequest::streaming(req.query, user.id());

    if let Some(conversation_id) = req.conversation_id {
        ensure_owned(&state, &user, &conversation_id).await?;
        request = request.conversation(conversation_id);
    }
    if let Some(inputs) = req.inputs {
        request = request.inputs(inputs);
    }

    let mut upstream = state.chat.send_message(request).await?;
    let user_id = user.id().to_string();

    let relay = async_stream::stream! {
        while let Some(item) = upstream.next().await {
            match item {
                Ok(event) => yield Ok::<Event, Infallible>(Event::default().data(relay_data(event.data))),
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "chat stream failed");
                    yield Ok(error_frame());
                    break;
                }
            }
        }
    };

    Ok(Sse::new(relay).keep_alive(KeepAlive::default()))
}

/// Fetch one page of a conversation's message history
#[utoipa::path(
    get,
    path = "/chat/messages",
    params(
        ("conversation_id" = String, Query, description = "Conversation to read"),
        ("first_id" = Option<String>, Query, description = "Return messages before this message id"),
        ("limit" = Option<u32>, Query, description = "Page size (default 20, max 100)")
    ),
    responses(
        (status = 200, description = "History page: {data, has_more, limit}"),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Conversation not owned by caller", body = ErrorBody)
    ),
    tag = "chat"
)]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<MessageHistory>> {
    let Query(params) = params.map_err(|e| ApiError::invalid("query", e.body_text()))?;
    let query = params.into_query(user.id())?;

    ensure_owned(&state, &user, &query.conversation_id).await?;

    let history = state.chat.get_messages(query).await?;
    Ok(Json(history))
}
