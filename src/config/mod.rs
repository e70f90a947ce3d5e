// Configuration module entry point
// Loads application configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    ArtifactsConfig, Config, HealthConfig, LoggingConfig, PerformanceConfig, ServerConfig,
};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from the path given as first program argument,
    /// falling back to `config` (any extension the config crate knows)
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (extension optional)
    ///
    /// Environment variables prefixed with `ARTIFACTS` override file values,
    /// with `__` between prefix and nested keys, e.g. `ARTIFACTS__SERVER__PORT=9000`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("ARTIFACTS").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 300)?
            .set_default("artifacts.root", "artifacts")?
            .set_default("artifacts.route_prefix", "/artifacts/")?
            .set_default("artifacts.checksum_suffix", ".SHA256SUM")?
            .set_default("artifacts.stream_channel_capacity", 16)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");
        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.artifacts.route_prefix, "/artifacts/");
        assert_eq!(config.artifacts.checksum_suffix, ".SHA256SUM");
        assert_eq!(config.logging.access_log_format, "combined");
        assert!(config.health.enabled);
        assert_eq!(config.health.liveness_path, "/healthz");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        fs::write(
            &path,
            r#"
[server]
host = "0.0.0.0"
port = 9090
workers = 4

[artifacts]
root = "/srv/artifacts"
route_prefix = "/download/"

[health]
enabled = false
"#,
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.workers, Some(4));
        assert_eq!(config.artifacts.root, "/srv/artifacts");
        assert_eq!(config.artifacts.route_prefix, "/download/");
        assert_eq!(config.artifacts.stream_channel_capacity, 16);
        assert!(!config.health.enabled);
        assert_eq!(
            config.get_socket_addr().unwrap(),
            "0.0.0.0:9090".parse().unwrap()
        );
    }

    #[test]
    fn test_env_overrides_file() {
        // No other test reads max_connections, so the process-wide variable is safe here
        std::env::set_var("ARTIFACTS__PERFORMANCE__MAX_CONNECTIONS", "64");
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("none").to_str().unwrap());
        std::env::remove_var("ARTIFACTS__PERFORMANCE__MAX_CONNECTIONS");
        assert_eq!(config.unwrap().performance.max_connections, Some(64));
    }

    #[test]
    fn test_invalid_address() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(dir.path().join("x").to_str().unwrap()).unwrap();
        config.server.host = "not an ip".to_string();
        assert!(config.get_socket_addr().is_err());
    }
}
