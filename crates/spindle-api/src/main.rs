use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spindle_api::{
    build_router,
    config::Config,
    identity::{GoTrueAdminClient, IdentityAdmin},
    state::AppState,
};
use spindle_chat::{ChatBackend, DifyClient, DifyConfig};
use spindle_persist::{MongoOptions, MongoThreadStore, ThreadStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Spindle API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    tracing::info!("Connecting to MongoDB");
    let options = MongoOptions {
        pool_size: config.mongodb.pool_size,
        timeout: Duration::from_millis(config.mongodb.timeout_ms),
    };
    let store: Arc<dyn ThreadStore> = Arc::new(
        MongoThreadStore::connect(&config.mongodb_uri, &config.mongodb.database, options).await?,
    );
    tracing::info!("MongoDB connected");

    tracing::info!("Initializing chat backend client at {}", config.chat.api_url);
    let chat: Arc<dyn ChatBackend> = Arc::new(DifyClient::new(
        DifyConfig::new(config.chat.api_url.clone(), config.dify_api_key.clone())
            .timeout(config.chat.timeout()),
    )?);

    let identity: Arc<dyn IdentityAdmin> = Arc::new(GoTrueAdminClient::new(
        config.identity.url.clone(),
        &config.identity_service_key,
        config.identity.timeout(),
    )?);

    let state = Arc::new(AppState::new(config.clone(), store, chat, identity));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
