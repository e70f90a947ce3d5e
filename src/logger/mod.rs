//! Logger module
//!
//! Diagnostics go through `tracing`, filtered by `logging.level` and written
//! to stderr or `logging.error_log_file`. Access logs are separate lines in
//! the configured format, written to stdout or `logging.access_log_file`.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initialize diagnostics and access logging
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> io::Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match config.logging.error_log_file.as_deref() {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(writer::open_log_file(path)?))
            .try_init(),
        None => builder.with_writer(io::stderr).try_init(),
    };
    installed.map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    writer::init(config.logging.access_log_file.as_deref())
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    info!("Artifact server listening on http://{addr}");
    info!(
        "Serving '{}' under '{}' (checksums: '<name>{}')",
        config.artifacts.root, config.artifacts.route_prefix, config.artifacts.checksum_suffix
    );
    if let Some(workers) = config.server.workers {
        info!("Worker threads: {workers}");
    }
    if let Some(max_connections) = config.performance.max_connections {
        info!("Max connections: {max_connections}");
    }
    if let Some(ref path) = config.logging.access_log_file {
        info!("Access log: {path}");
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(writer) => writer.write_line(&line),
        None => println!("{line}"),
    }
}
