#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use spindle_api::{
    build_router,
    config::Config,
    identity::{AdminUser, IdentityAdmin, IdentityError, NO_BAN},
    state::AppState,
};
use spindle_chat::{
    ChatBackend, ChatError, ChatEvent, ChatMessageRequest, ChatStream, HistoryQuery,
    MessageHistory,
};
use spindle_persist::{
    InMemoryThreadStore, NewThread, PersistError, Thread, ThreadPatch, ThreadStore,
};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const ALICE: &str = "0a9d3c36-1c3e-4c34-9f3c-1b2f6b7c8d01";
pub const BOB: &str = "5e2f7a10-3b4c-4d5e-8f60-718293a4b5c6";
pub const ADMIN: &str = "9c8b7a65-4321-4fed-8cba-0987654321ab";

pub fn test_config() -> Config {
    let mut config: Config = toml::from_str(
        r#"
        [server]
        host = "127.0.0.1"
        port = 0

        [cors]
        enabled = true
        origins = ["http://localhost:3000"]

        [mongodb]
        database = "spindle_test"

        [chat]
        api_url = "http://chat.invalid/v1"

        [auth]
        cookie_name = "sb-access-token"
        audience = "authenticated"

        [identity]
        url = "http://identity.invalid/auth/v1"

        [logging]
        level = "debug"
        format = "pretty"
        "#,
    )
    .unwrap();
    config.auth_jwt_secret = JWT_SECRET.to_string();
    config
}

/// Mint a session token the way the auth provider would
pub fn token(user_id: &str) -> String {
    sign(json!({
        "sub": user_id,
        "aud": "authenticated",
        "exp": chrono::Utc::now().timestamp() + 3600,
        "email": format!("{}@example.com", &user_id[..8]),
        "role": "authenticated",
    }))
}

pub fn admin_token(user_id: &str) -> String {
    sign(json!({
        "sub": user_id,
        "aud": "authenticated",
        "exp": chrono::Utc::now().timestamp() + 3600,
        "role": "authenticated",
        "app_metadata": {"role": "admin"},
    }))
}

fn sign(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Chat backend that replays canned SSE payloads and records requests
pub struct StubChat {
    pub sent: Mutex<Vec<ChatMessageRequest>>,
    pub history_queries: Mutex<Vec<HistoryQuery>>,
    /// `Err` entries become transport failures mid-stream
    pub frames: Mutex<Vec<Result<String, String>>>,
    pub reject_status: Mutex<Option<u16>>,
}

impl StubChat {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            history_queries: Mutex::new(Vec::new()),
            frames: Mutex::new(vec![
                Ok(r#"{"event":"message","conversation_id":"conv-new","message_id":"m1","answer":"Hel"}"#.to_string()),
                Ok(r#"{"event":"message","conversation_id":"conv-new","message_id":"m1","answer":"lo"}"#.to_string()),
                Ok(r#"{"event":"message_end","conversation_id":"conv-new","message_id":"m1"}"#.to_string()),
            ]),
            reject_status: Mutex::new(None),
        }
    }

    pub fn set_frames(&self, frames: Vec<Result<&str, &str>>) {
        *self.frames.lock().unwrap() = frames
            .into_iter()
            .map(|f| f.map(str::to_string).map_err(str::to_string))
            .collect();
    }

    pub fn reject_with(&self, status: u16) {
        *self.reject_status.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl ChatBackend for StubChat {
    async fn send_message(&self, request: ChatMessageRequest) -> spindle_chat::error::Result<ChatStream> {
        self.sent.lock().unwrap().push(request);

        if let Some(status) = *self.reject_status.lock().unwrap() {
            return Err(ChatError::Upstream {
                status,
                body: "rejected".to_string(),
            });
        }

        let items: Vec<_> = self
            .frames
            .lock()
            .unwrap()
            .clone()
            .into_iter()
            .map(|frame| match frame {
                Ok(data) => ChatEvent::from_data(data),
                Err(reason) => Err(ChatError::Stream(reason)),
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn get_messages(&self, query: HistoryQuery) -> spindle_chat::error::Result<MessageHistory> {
        if let Some(status) = *self.reject_status.lock().unwrap() {
            return Err(ChatError::Upstream {
                status,
                body: "rejected".to_string(),
            });
        }

        let history = serde_json::from_value(json!({
            "limit": query.limit,
            "has_more": false,
            "data": [{
                "id": "m1",
                "conversation_id": query.conversation_id,
                "query": "Hello",
                "answer": "Hi there!",
                "created_at": 1700000000,
                "feedback": null
            }]
        }))?;
        self.history_queries.lock().unwrap().push(query);
        Ok(history)
    }
}

/// In-memory identity provider
pub struct StubIdentity {
    pub users: Mutex<Vec<AdminUser>>,
    pub fail: Mutex<bool>,
}

impl StubIdentity {
    pub fn new() -> Self {
        let users = vec![
            admin_user(ALICE, "alice@example.com", "alice", "2024-01-01T00:00:00Z", true),
            admin_user(BOB, "bob@example.com", "bobby", "2024-02-01T00:00:00Z", true),
            admin_user(ADMIN, "root@example.com", "root", "2023-06-01T00:00:00Z", true),
            admin_user(
                "77777777-7777-4777-8777-777777777777",
                "new@test.org",
                "newbie",
                "2024-03-01T00:00:00Z",
                false,
            ),
        ];
        Self {
            users: Mutex::new(users),
            fail: Mutex::new(false),
        }
    }
}

pub fn admin_user(id: &str, email: &str, username: &str, created_at: &str, confirmed: bool) -> AdminUser {
    let confirmed_at = if confirmed {
        json!("2024-01-02T00:00:00Z")
    } else {
        Value::Null
    };
    serde_json::from_value(json!({
        "id": id,
        "email": email,
        "created_at": created_at,
        "email_confirmed_at": confirmed_at,
        "banned_until": null,
        "user_metadata": {"username": username},
        "role": "authenticated",
    }))
    .unwrap()
}

#[async_trait]
impl IdentityAdmin for StubIdentity {
    async fn list_all_users(&self) -> Result<Vec<AdminUser>, IdentityError> {
        if *self.fail.lock().unwrap() {
            return Err(IdentityError::Upstream {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.users.lock().unwrap().clone())
    }

    async fn set_ban(&self, user_id: &str, ban_duration: &str) -> Result<AdminUser, IdentityError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| IdentityError::Upstream {
                status: 404,
                body: "User not found".to_string(),
            })?;

        user.banned_until = if ban_duration == NO_BAN {
            None
        } else {
            Some("2124-01-01T00:00:00Z".to_string())
        };
        Ok(user.clone())
    }
}

/// Store whose every call fails, as if the database were unreachable
pub struct UnreachableStore;

#[async_trait]
impl ThreadStore for UnreachableStore {
    async fn list_threads(&self, _: &str) -> spindle_persist::error::Result<Vec<Thread>> {
        Err(down())
    }
    async fn create_thread(&self, _: &str, _: NewThread) -> spindle_persist::error::Result<Thread> {
        Err(down())
    }
    async fn get_thread(&self, _: &str, _: Uuid) -> spindle_persist::error::Result<Option<Thread>> {
        Err(down())
    }
    async fn find_by_conversation(
        &self,
        _: &str,
        _: &str,
    ) -> spindle_persist::error::Result<Option<Thread>> {
        Err(down())
    }
    async fn update_thread(
        &self,
        _: &str,
        _: Uuid,
        _: ThreadPatch,
    ) -> spindle_persist::error::Result<Option<Thread>> {
        Err(down())
    }
    async fn toggle_archived(&self, _: &str, _: Uuid) -> spindle_persist::error::Result<Option<Thread>> {
        Err(down())
    }
    async fn delete_thread(&self, _: &str, _: Uuid) -> spindle_persist::error::Result<bool> {
        Err(down())
    }
    async fn ping(&self) -> spindle_persist::error::Result<()> {
        Err(down())
    }
}

fn down() -> PersistError {
    PersistError::Connection("connection refused".to_string())
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryThreadStore>,
    pub chat: Arc<StubChat>,
    pub identity: Arc<StubIdentity>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryThreadStore::new());
        let chat = Arc::new(StubChat::new());
        let identity = Arc::new(StubIdentity::new());

        let state = AppState::new(test_config(), store.clone(), chat.clone(), identity.clone());

        Self {
            router: build_router(Arc::new(state)),
            store,
            chat,
            identity,
        }
    }

    pub fn with_store(store: Arc<dyn ThreadStore>) -> Router {
        let state = AppState::new(
            test_config(),
            store,
            Arc::new(StubChat::new()),
            Arc::new(StubIdentity::new()),
        );
        build_router(Arc::new(state))
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        call(&self.router, method, uri, token, body.map(|b| b.to_string())).await
    }

    /// Create a thread as `user` and return its JSON
    pub async fn create_thread(&self, user: &str, conversation_id: &str, title: Option<&str>) -> Value {
        let mut body = json!({"conversationId": conversation_id});
        if let Some(title) = title {
            body["title"] = json!(title);
        }
        let (status, json) = self
            .call("POST", "/threads", Some(&token(user)), Some(body))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
        json["thread"].clone()
    }
}

pub fn build_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<String>,
) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))?,
        None => builder.body(Body::empty())?,
    };
    Ok(request)
}

/// Send a request and decode the JSON body (`Null` when empty)
pub async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<String>,
) -> anyhow::Result<(StatusCode, Value)> {
    let response = router
        .clone()
        .oneshot(build_request(method, uri, token, body)?)
        .await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, json))
}

/// Send a request and return the raw body text with its content type
pub async fn call_text(
    router: &Router,
    request: Request<Body>,
) -> anyhow::Result<(StatusCode, String, String)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok((status, content_type, String::from_utf8(bytes.to_vec())?))
}

/// The `data:` payloads of an SSE body, in order
pub fn sse_payloads(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|frame| {
            let data: Vec<&str> = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|d| d.strip_prefix(' ').unwrap_or(d))
                .collect();
            if data.is_empty() {
                None
            } else {
                serde_json::from_str(&data.join("\n")).ok()
            }
        })
        .collect()
}
