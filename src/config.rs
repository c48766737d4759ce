//! Configuration loading and management.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// API server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: Option<DatabaseConfig>,
    /// Stale-session sweep settings.
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// API server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the API to (e.g., "0.0.0.0:8080").
    #[serde(default = "defaults::bind")]
    pub bind: SocketAddr,
    /// Community name, used in logs and the landing payload.
    #[serde(default = "defaults::name")]
    pub name: String,
    /// Prometheus port. 0 disables the metrics endpoint (used by tests).
    pub metrics_port: Option<u16>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    pub path: String,
}

/// Settings for the background task that closes stale sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweep passes.
    #[serde(default = "defaults::sweep_interval_secs")]
    pub interval_secs: u64,
}

mod defaults {
    use std::net::SocketAddr;

    pub fn bind() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 8080))
    }

    pub fn name() -> String {
        "rosterd".to_string()
    }

    pub fn sweep_interval_secs() -> u64 {
        60
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            name: defaults::name(),
            metrics_port: None,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::sweep_interval_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.server.name, "rosterd");
        assert_eq!(config.sweep.interval_secs, 60);
        assert!(config.database.is_none());
    }

    #[test]
    fn full_config_parses() {
        let raw = r#"
            [server]
            bind = "127.0.0.1:9000"
            name = "volley"
            metrics_port = 9100

            [database]
            path = "/var/lib/rosterd/rosterd.db"

            [sweep]
            interval_secs = 30
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.server.metrics_port, Some(9100));
        assert_eq!(config.database.unwrap().path, "/var/lib/rosterd/rosterd.db");
        assert_eq!(config.sweep.interval_secs, 30);
    }
}
