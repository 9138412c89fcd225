pub mod admin;
pub mod chat;
pub mod health;
pub mod threads;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    error::ErrorBody,
    identity::{AdminUser, UserPage, UserStatus, UserSummary},
    middleware::logging,
    state::AppState,
    validation::FieldError,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        threads::list_threads,
        threads::create_thread,
        threads::get_thread,
        threads::update_thread,
        threads::toggle_archive,
        threads::delete_thread,
        chat::send_message,
        chat::get_messages,
        admin::list_users,
        admin::suspend_user,
        admin::unsuspend_user,
    ),
    components(schemas(
        ErrorBody,
        FieldError,
        health::HealthResponse,
        threads::CreateThreadRequest,
        threads::UpdateThreadRequest,
        threads::ThreadResponse,
        threads::ThreadEnvelope,
        threads::ThreadListResponse,
        chat::SendMessageRequest,
        AdminUser,
        UserStatus,
        UserSummary,
        UserPage,
        admin::UserActionResponse,
    )),
    tags(
        (name = "threads", description = "Chat threads owned by the caller"),
        (name = "chat", description = "Streaming chat proxy"),
        (name = "admin", description = "User management"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Threads
        .route("/threads", get(threads::list_threads).post(threads::create_thread))
        .route(
            "/threads/:thread_id",
            get(threads::get_thread)
                .patch(threads::update_thread)
                .delete(threads::delete_thread),
        )
        .route("/threads/:thread_id/archive", patch(threads::toggle_archive))
        // Chat
        .route("/chat", post(chat::send_message))
        .route("/chat/messages", get(chat::get_messages))
        // Admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:user_id/suspend", post(admin::suspend_user))
        .route("/admin/users/:user_id/unsuspend", post(admin::unsuspend_user));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if !config.cors.enabled {
        return CorsLayer::new();
    }

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.cors.origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let parsed_origins: Vec<HeaderValue> = config
            .cors
            .origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();

        // Cookie sessions need credentialed CORS, which rules out `*`
        cors.allow_origin(parsed_origins).allow_credentials(true)
    }
}
