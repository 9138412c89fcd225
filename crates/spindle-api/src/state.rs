use axum::extract::FromRef;
use std::sync::Arc;

use crate::auth::SessionGuard;
use crate::config::Config;
use crate::identity::IdentityAdmin;
use spindle_chat::ChatBackend;
use spindle_persist::ThreadStore;

/// Shared application state passed to all handlers
///
/// Backends are trait objects so tests can swap in in-memory stand-ins.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ThreadStore>,
    pub chat: Arc<dyn ChatBackend>,
    pub identity: Arc<dyn IdentityAdmin>,
    pub session: SessionGuard,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ThreadStore>,
        chat: Arc<dyn ChatBackend>,
        identity: Arc<dyn IdentityAdmin>,
    ) -> Self {
        let session = SessionGuard::new(&config.auth_jwt_secret, &config.auth);
        Self {
            config: Arc::new(config),
            store,
            chat,
            identity,
            session,
        }
    }
}

impl FromRef<Arc<AppState>> for SessionGuard {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.session.clone()
    }
}
