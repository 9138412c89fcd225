use config::{Config as ConfigLoader, ConfigError, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub mongodb: MongoDbConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
    #[serde(default)]
    pub dify_api_key: String,
    #[serde(default)]
    pub auth_jwt_secret: String,
    #[serde(default)]
    pub identity_service_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_mongo_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_pool_size() -> u32 {
    10
}

fn default_mongo_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the Dify service API, including `/v1`
    pub api_url: String,
    #[serde(default = "default_chat_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_chat_timeout_ms() -> u64 {
    30_000
}

impl ChatConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Expected `aud` claim; not checked when unset
    #[serde(default)]
    pub audience: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            audience: None,
        }
    }
}

fn default_cookie_name() -> String {
    "sb-access-token".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// GoTrue base URL, e.g. `https://<project>.supabase.co/auth/v1`
    pub url: String,
    #[serde(default = "default_identity_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_identity_timeout_ms() -> u64 {
    10_000
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Environment variables that override individual keys
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("SERVER_REQUEST_TIMEOUT_SECS", "server.request_timeout_secs"),
    ("CORS_ENABLED", "cors.enabled"),
    ("MONGODB_DATABASE", "mongodb.database"),
    ("MONGODB_POOL_SIZE", "mongodb.pool_size"),
    ("MONGODB_TIMEOUT_MS", "mongodb.timeout_ms"),
    ("DIFY_API_URL", "chat.api_url"),
    ("CHAT_API_URL", "chat.api_url"),
    ("CHAT_TIMEOUT_MS", "chat.timeout_ms"),
    ("AUTH_COOKIE_NAME", "auth.cookie_name"),
    ("AUTH_AUDIENCE", "auth.audience"),
    ("IDENTITY_URL", "identity.url"),
    ("IDENTITY_TIMEOUT_MS", "identity.timeout_ms"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_, MONGODB_, CHAT_, AUTH_, IDENTITY_, LOG_)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Load secrets from ENV (not in TOML)
        cfg.mongodb_uri = required_env("MONGODB_URI")?;
        cfg.dify_api_key = required_env("DIFY_API_KEY")?;
        cfg.auth_jwt_secret = required_env("AUTH_JWT_SECRET")?;
        cfg.identity_service_key = required_env("IDENTITY_SERVICE_KEY")?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Message(format!("{} environment variable is required", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 3000

            [cors]
            enabled = true
            origins = ["http://localhost:3000"]

            [mongodb]
            database = "test"

            [chat]
            api_url = "http://localhost:5001/v1"

            [identity]
            url = "http://localhost:54321/auth/v1"

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout_secs, 300);
        assert_eq!(config.mongodb.database, "test");
        assert_eq!(config.mongodb.pool_size, 10);
        assert_eq!(config.chat.timeout(), Duration::from_secs(30));
        assert_eq!(config.identity.timeout(), Duration::from_secs(10));
        assert_eq!(config.auth.cookie_name, "sb-access-token");
        assert!(config.auth.audience.is_none());
        assert!(config.dify_api_key.is_empty());
    }

    #[test]
    fn test_default_toml_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::from_file(path).unwrap();

        assert_eq!(config.auth.audience.as_deref(), Some("authenticated"));
        assert_eq!(config.chat.timeout_ms, 30_000);
        assert_eq!(config.identity.timeout_ms, 15_000);
    }
}
