// Configuration types module
// Defines all configuration-related data structures

use crate::handler::static_files::StaticOptions;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub static_files: StaticFilesConfig,
    /// Directories served through the router
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
    pub rate_limit: RateLimitConfig,
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
    /// Diagnostic log filter, e.g. `info` or `waypost=debug`
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Diagnostic log file path (optional, stderr if not set)
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
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Defaults applied to every static mount
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    pub index_file: String,
    pub directory_listing: bool,
    /// `Cache-Control` max-age in seconds, 0 disables the header
    pub cache_max_age: u64,
}

impl StaticFilesConfig {
    pub fn to_options(&self) -> StaticOptions {
        StaticOptions {
            index_file: self.index_file.clone(),
            directory_listing: self.directory_listing,
            cache_max_age: Duration::from_secs(self.cache_max_age),
            ..StaticOptions::default()
        }
    }
}

/// One local directory served under a URL prefix
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MountConfig {
    pub url_prefix: String,
    pub root: String,
}

/// Per-client-IP rate limiting
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst: u32,
}
