// ============================================
// File: crates/meshwire-node/src/config.rs
// ============================================
//! # Node Configuration
//!
//! ## Creation Reason
//! Provides configuration management for a meshwire node, loaded from a
//! TOML file.
//!
//! ## Main Functionality
//! - `NodeConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//!
//! ## Configuration Sections
//! - `network`: Listen address and peers to dial on start-up
//! - `middleman`: Application identifier, heartbeat period, payload limit
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! listen_addr = "0.0.0.0:4242"
//! peers = ["10.0.0.2:4242"]
//!
//! [middleman]
//! app_identifier = "meshwire"
//! heartbeat_interval_ms = 5000
//! max_payload_len = 16777216
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Nodes with different `app_identifier` values refuse each other's handshakes
//! - `heartbeat_interval_ms = 0` disables heartbeats entirely
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{NodeError, Result};

// ============================================
// NodeConfig
// ============================================

/// Main node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Protocol engine configuration.
    #[serde(default)]
    pub middleman: MiddlemanConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NodeError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.middleman.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Heartbeat period, `None` if heartbeats are disabled.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        match self.middleman.heartbeat_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Peers dialed on start-up.
    #[serde(default)]
    pub peers: Vec<SocketAddr>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 4242))
}

impl NetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.peers.contains(&self.listen_addr) {
            return Err(NodeError::config_invalid(
                "network.peers",
                "must not contain the listen address",
            ));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            peers: Vec::new(),
        }
    }
}

// ============================================
// MiddlemanConfig
// ============================================

/// Protocol engine configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlemanConfig {
    /// Identifier embedded in handshakes.
    #[serde(default = "default_app_identifier")]
    pub app_identifier: String,

    /// Heartbeat period in milliseconds (0 = disabled).
    #[serde(default)]
    pub heartbeat_interval_ms: u64,

    /// Largest payload accepted on a stream connection.
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

fn default_app_identifier() -> String {
    "meshwire".to_string()
}

const fn default_max_payload_len() -> usize {
    16 * 1024 * 1024
}

impl MiddlemanConfig {
    fn validate(&self) -> Result<()> {
        if self.app_identifier.trim().is_empty() {
            return Err(NodeError::config_invalid(
                "middleman.app_identifier",
                "cannot be empty",
            ));
        }
        if self.max_payload_len == 0 {
            return Err(NodeError::config_invalid(
                "middleman.max_payload_len",
                "must be greater than 0",
            ));
        }
        if self.max_payload_len > u32::MAX as usize {
            return Err(NodeError::config_invalid(
                "middleman.max_payload_len",
                "must fit in 32 bits",
            ));
        }
        Ok(())
    }
}

impl Default for MiddlemanConfig {
    fn default() -> Self {
        Self {
            app_identifier: default_app_identifier(),
            heartbeat_interval_ms: 0,
            max_payload_len: default_max_payload_len(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.listen_addr.port(), 4242);
        assert_eq!(config.middleman.app_identifier, "meshwire");
        assert!(config.heartbeat_interval().is_none());
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            [network]
            listen_addr = "127.0.0.1:5000"
            peers = ["10.0.0.2:4242", "10.0.0.3:4242"]

            [middleman]
            app_identifier = "cluster-a"
            heartbeat_interval_ms = 2500
            max_payload_len = 1024

            [logging]
            level = "debug"
        "#;

        let config = NodeConfig::from_str(toml).unwrap();
        assert_eq!(config.network.listen_addr.port(), 5000);
        assert_eq!(config.network.peers.len(), 2);
        assert_eq!(config.middleman.app_identifier, "cluster-a");
        assert_eq!(config.heartbeat_interval(), Some(Duration::from_millis(2500)));
        assert_eq!(config.middleman.max_payload_len, 1024);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = NodeConfig::from_str("[middleman]\nheartbeat_interval_ms = 100\n").unwrap();
        assert_eq!(config.network.listen_addr, default_listen_addr());
        assert_eq!(config.middleman.max_payload_len, 16 * 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_empty_app_identifier_rejected() {
        let err = NodeConfig::from_str("[middleman]\napp_identifier = \"  \"\n").unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("middleman.app_identifier"));
    }

    #[test]
    fn test_zero_payload_limit_rejected() {
        let err = NodeConfig::from_str("[middleman]\nmax_payload_len = 0\n").unwrap_err();
        assert!(matches!(err, NodeError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_self_peer_rejected() {
        let toml = r#"
            [network]
            listen_addr = "127.0.0.1:4242"
            peers = ["127.0.0.1:4242"]
        "#;
        assert!(NodeConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut config = NodeConfig::default();
        config.middleman.app_identifier = "roundtrip".to_string();
        let parsed = NodeConfig::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed.middleman.app_identifier, "roundtrip");
    }
}
