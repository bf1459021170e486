//! TOML-based configuration for the server.
//!
//! Reads and writes [`AppConfig`] at the platform-appropriate path:
//! - Windows:  `%APPDATA%\Keyrelay\config.toml`
//! - Unix:     `$XDG_CONFIG_HOME/keyrelay/config.toml` (or `~/.config/...`)
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]` so the server works on
//! first run (no config file yet) and keeps working when upgrading from an
//! older file that is missing newer fields.  A missing file is not an
//! error: [`AppConfig::load`] returns the defaults.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use keyrelay_core::{CLIENT_TIMEOUT, SWEEP_INTERVAL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::{ListenerConfig, TransportKind, DEFAULT_PORT};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Port the listener binds.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// `"udp"` (connectionless) or `"tcp"` (connection-oriented).
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    /// Seconds of silence before a datagram peer is evicted.
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,
    /// Period of the stale-client sweep, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_transport() -> TransportKind {
    TransportKind::Udp
}

fn default_client_timeout_secs() -> u64 {
    CLIENT_TIMEOUT.as_secs()
}

fn default_sweep_interval_secs() -> u64 {
    SWEEP_INTERVAL.as_secs()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            transport: default_transport(),
            client_timeout_secs: default_client_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl NetworkConfig {
    /// Builds the runtime [`ListenerConfig`] from the stored settings.
    ///
    /// An unparsable bind address falls back to all interfaces rather than
    /// failing startup over a typo in a hand-edited file.
    pub fn to_listener_config(&self) -> ListenerConfig {
        let bind_address: IpAddr = self
            .bind_address
            .parse()
            .unwrap_or_else(|_| IpAddr::from([0, 0, 0, 0]));
        ListenerConfig {
            bind_address,
            port: self.port,
            transport: self.transport,
            client_timeout: Duration::from_secs(self.client_timeout_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

// ── Load / save ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// The platform config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = if cfg!(target_os = "windows") {
            std::env::var_os("APPDATA").map(PathBuf::from)
        } else {
            std::env::var_os("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        };
        let base = base.ok_or(ConfigError::NoPlatformConfigDir)?;
        Ok(base.join("keyrelay").join("config.toml"))
    }

    /// Loads the config from `path`, returning defaults when the file does
    /// not exist.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(toml::from_str(&text)?)
    }

    /// Writes the config to `path`, creating parent directories as needed.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_deployment() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.network.port, 12345);
        assert_eq!(cfg.network.bind_address, "0.0.0.0");
        assert_eq!(cfg.network.transport, TransportKind::Udp);
        assert_eq!(cfg.network.client_timeout_secs, 10);
        assert_eq!(cfg.network.sweep_interval_secs, 5);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_partial_toml_fills_in_defaults() {
        // Only the port is specified; every other field takes its default.
        let cfg: AppConfig = toml::from_str(
            r#"
            [network]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(cfg.network.port, 9000);
        assert_eq!(cfg.network.transport, TransportKind::Udp);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_transport_round_trips_through_toml() {
        let mut cfg = AppConfig::default();
        cfg.network.transport = TransportKind::Tcp;

        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::env::temp_dir().join("keyrelay-test-does-not-exist.toml");
        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        // Arrange
        let path =
            std::env::temp_dir().join(format!("keyrelay-test-{}.toml", std::process::id()));
        let mut cfg = AppConfig::default();
        cfg.network.port = 23456;

        // Act
        cfg.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_to_listener_config_converts_durations() {
        let net = NetworkConfig {
            client_timeout_secs: 20,
            sweep_interval_secs: 7,
            ..Default::default()
        };

        let listener = net.to_listener_config();

        assert_eq!(listener.client_timeout, Duration::from_secs(20));
        assert_eq!(listener.sweep_interval, Duration::from_secs(7));
    }

    #[test]
    fn test_to_listener_config_bad_bind_address_falls_back() {
        let net = NetworkConfig {
            bind_address: "not-an-ip".to_string(),
            ..Default::default()
        };

        let listener = net.to_listener_config();

        assert_eq!(listener.bind_address, IpAddr::from([0, 0, 0, 0]));
    }
}
