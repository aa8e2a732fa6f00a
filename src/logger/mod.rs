//! Logger module
//!
//! Two streams of output:
//! - Diagnostics (startup, routing, recovered panics, connection errors) through
//!   `tracing`, filtered by `logging.level` or `RUST_LOG`
//! - Access log lines in combined, common, json or custom format

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize diagnostics and the access log writer
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.error_log_file.as_deref() {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(writer::open_log_file(path)?))
            .try_init(),
        None => builder.with_writer(io::stderr).try_init(),
    };
    installed.map_err(io::Error::other)?;

    writer::init(config.access_log_file.as_deref())
}

/// Write a formatted access log line
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write(&line),
        None => println!("{line}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    info!("Listening on: http://{addr}");
    info!(level = %config.logging.level, "Log level");
    if let Some(workers) = config.server.workers {
        info!(workers, "Worker threads");
    }
    if let Some(ref path) = config.logging.access_log_file {
        info!(%path, "Access log");
    }
    for mount in &config.mounts {
        info!(url_prefix = %mount.url_prefix, root = %mount.root, "Static mount");
    }
    if config.rate_limit.enabled {
        info!(
            requests_per_second = config.rate_limit.requests_per_second,
            burst = config.rate_limit.burst,
            "Rate limiting enabled"
        );
    }
}
