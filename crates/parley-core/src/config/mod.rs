//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so that an empty
//! configuration source still yields a runnable server.

pub mod app;
pub mod auth;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;
use crate::result::AppResult;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Presence and chat engine settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PARLEY__`.
    pub fn load(env: &str) -> AppResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PARLEY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(source: &str) -> AppResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde defaults cannot express.
    pub fn validate(&self) -> AppResult<()> {
        self.realtime.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = AppConfig::from_toml("").expect("empty config is valid");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.realtime.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.realtime.grace_period(), Duration::from_secs(12));
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AppConfig::from_toml(
            r#"
            [realtime]
            grace_period_seconds = 15
            request_timeout_seconds = 45

            [server]
            port = 9000
            "#,
        )
        .expect("valid config");

        assert_eq!(config.realtime.grace_period(), Duration::from_secs(15));
        assert_eq!(config.realtime.request_timeout(), Duration::from_secs(45));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.realtime.outbound_buffer_size, 256);
    }

    #[test]
    fn test_wrong_type_is_a_configuration_error() {
        let err = AppConfig::from_toml("[server]\nport = \"not a port\"").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_zero_ping_interval_is_rejected() {
        let err = AppConfig::from_toml("[realtime]\nping_interval_seconds = 0").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
        assert!(err.message.contains("ping_interval_seconds"));
    }

    #[test]
    fn test_ping_timeout_shorter_than_interval_is_rejected() {
        let err = AppConfig::from_toml(
            "[realtime]\nping_interval_seconds = 30\nping_timeout_seconds = 10",
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_out_of_range_request_timeout_is_rejected() {
        let err = AppConfig::from_toml("[realtime]\nrequest_timeout_seconds = 10000000000000")
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
        assert!(err.message.contains("request_timeout_seconds"));

        let err = AppConfig::from_toml("[realtime]\nrequest_timeout_seconds = 0").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_zero_history_cap_is_rejected() {
        let err = AppConfig::from_toml("[realtime]\nmax_history_messages = 0").unwrap_err();
        assert!(err.message.contains("max_history_messages"));
        let config = AppConfig::from_toml("").expect("defaults");
        assert_eq!(config.realtime.max_history_messages, 200);
    }

    #[test]
    fn test_week_long_timers_are_accepted() {
        let config = AppConfig::from_toml(
            "[realtime]\ngrace_period_seconds = 604800\nrequest_timeout_seconds = 604800",
        )
        .expect("within bounds");
        assert_eq!(config.realtime.request_timeout(), Duration::from_secs(604_800));
    }
}
