// Configuration module entry point
// Loads the server configuration from a TOML file, environment and defaults

mod types;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use std::net::{AddrParseError, SocketAddr};

// Re-export public types
pub use types::{
    Config, HttpConfig, LoggingConfig, MountConfig, PerformanceConfig, RateLimitConfig,
    ServerConfig, StaticFilesConfig,
};

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// A missing file is not an error. `WAYPOST_<SECTION>__<KEY>` environment
    /// variables override file values, e.g. `WAYPOST_SERVER__PORT=9000`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::with_defaults(
            config::Config::builder()
                .add_source(File::with_name(config_path).required(false))
                .add_source(
                    Environment::with_prefix("WAYPOST")
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, config::ConfigError> {
        Self::with_defaults(
            config::Config::builder().add_source(File::from_str(contents, FileFormat::Toml)),
        )
    }

    fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        let settings = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "waypost")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("static_files.index_file", "index.html")?
            .set_default("static_files.directory_listing", true)?
            .set_default("static_files.cache_max_age", 86_400)? // 24h
            .set_default("rate_limit.enabled", false)?
            .set_default("rate_limit.requests_per_second", 50)?
            .set_default("rate_limit.burst", 100)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
