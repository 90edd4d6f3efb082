// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub images: ImageConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    /// Seconds a client gets to send complete request headers
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
}

/// Image catalogue on the remote host
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    /// Highest horizontal image number (images are numbered from 1)
    pub max_horizontal: u32,
    /// Highest vertical image number
    pub max_vertical: u32,
    /// Remote directory holding the `h/` and `v/` folders, without trailing slash
    pub base_url: String,
    /// Free-form note shown in the help text (e.g. when the catalogue was last synced)
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_horizontal: 901,
            max_vertical: 3306,
            base_url: "https://cnb.cool/2x.nz/r3/-/git/raw/main/ri".to_string(),
            last_updated: None,
        }
    }
}

/// Health check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    /// Enable health check endpoints
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    /// Liveness check path (default: /healthz)
    #[serde(default = "default_healthz_path")]
    pub liveness_path: String,
    /// Readiness check path (default: /readyz)
    #[serde(default = "default_readyz_path")]
    pub readiness_path: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_healthz_path() -> String {
    "/healthz".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_readyz_path() -> String {
    "/readyz".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            liveness_path: default_healthz_path(),
            readiness_path: default_readyz_path(),
        }
    }
}

impl HealthConfig {
    /// Whether `path` is one of the health endpoints
    pub fn is_health_path(&self, path: &str) -> bool {
        self.enabled && (path == self.liveness_path || path == self.readiness_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_paths() {
        let mut health = HealthConfig::default();
        assert!(health.is_health_path("/healthz"));
        assert!(health.is_health_path("/readyz"));
        assert!(!health.is_health_path("/"));
        health.enabled = false;
        assert!(!health.is_health_path("/healthz"));
    }
}
