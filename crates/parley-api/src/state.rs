//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use parley_auth::jwt::JwtDecoder;
use parley_core::config::AppConfig;
use parley_realtime::{RealtimeEngine, WsAuthenticator};

/// Shared application state, cloned into every handler by Axum.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Presence and chat engine.
    pub engine: RealtimeEngine,
    /// Verifies bearer tokens on HTTP routes.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Verifies the `token` query parameter at WebSocket upgrade.
    pub authenticator: WsAuthenticator,
    /// When the server started, for uptime reporting.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire the state from configuration and a running engine.
    pub fn new(config: AppConfig, engine: RealtimeEngine) -> Self {
        let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));
        let authenticator = WsAuthenticator::new(Arc::clone(&jwt_decoder));
        Self {
            config: Arc::new(config),
            engine,
            jwt_decoder,
            authenticator,
            started_at: Utc::now(),
        }
    }

    /// Seconds since the server started.
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
