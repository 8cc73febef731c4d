//! Configuration management for the Rollcall backend
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Face engine configuration
    pub face: FaceConfig,

    /// Attendance policy configuration
    pub attendance: AttendanceConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Token lifetime in seconds (7 days)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// Email of the bootstrap admin account
    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    /// Password of the bootstrap admin account
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FaceConfig {
    /// Face engine provider: remote, mock
    #[serde(default = "default_face_provider")]
    pub provider: String,

    /// Base URL of the remote face service
    pub base_url: Option<String>,

    /// Encoding vector length
    #[serde(default = "default_face_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_face_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries against the face service
    #[serde(default = "default_face_retries")]
    pub max_retries: u32,

    /// Maximum encoding distance accepted as the same person
    #[serde(default = "default_match_tolerance")]
    pub match_tolerance: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttendanceConfig {
    /// Seconds after session start during which check-in is allowed
    #[serde(default = "default_code_window")]
    pub code_window_secs: i64,

    /// Session code length in decimal digits
    #[serde(default = "default_code_length")]
    pub code_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_jwt_secret() -> String { "change-me-in-production".to_string() }
fn default_token_ttl() -> u64 { 7 * 24 * 60 * 60 }
fn default_admin_email() -> String { "admin@smart.edu".to_string() }
fn default_admin_password() -> String { "admin123".to_string() }
fn default_face_provider() -> String { "remote".to_string() }
fn default_face_dimension() -> usize { 128 }
fn default_face_timeout() -> u64 { 10 }
fn default_face_retries() -> u32 { 3 }
fn default_match_tolerance() -> f32 { 0.4 }
fn default_code_window() -> i64 { 60 }
fn default_code_length() -> usize { 6 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "rollcall".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/rollcall".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            auth: AuthConfig {
                jwt_secret: default_jwt_secret(),
                token_ttl_secs: default_token_ttl(),
                admin_email: default_admin_email(),
                admin_password: default_admin_password(),
            },
            face: FaceConfig {
                provider: default_face_provider(),
                base_url: None,
                dimension: default_face_dimension(),
                timeout_secs: default_face_timeout(),
                max_retries: default_face_retries(),
                match_tolerance: default_match_tolerance(),
            },
            attendance: AttendanceConfig {
                code_window_secs: default_code_window(),
                code_length: default_code_length(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.attendance.code_window_secs, 60);
        assert_eq!(config.attendance.code_length, 6);
        assert_eq!(config.face.match_tolerance, 0.4);
    }

    #[test]
    fn test_token_ttl_is_seven_days() {
        let config = AppConfig::default();
        assert_eq!(config.auth.token_ttl_secs, 604_800);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/rollcall");
    }
}
