// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge configuration.
//!
//! Supports both programmatic and file-based configuration. Configuration is
//! parsed and validated once at startup; the synchronization core never
//! coerces configuration values itself.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Bridge name, also used as the store namespace.
    #[serde(default = "default_name")]
    pub name: String,

    /// Broker hostname or IP address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional broker credentials.
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Base topic identifying this bridge's namespace on the wire.
    #[serde(default = "default_base_topic")]
    pub base_topic: String,

    /// Connect over TLS.
    #[serde(default)]
    pub tls: bool,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Statistics reporting interval (seconds, 0 to disable).
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

fn default_name() -> String {
    "hasp".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_base_topic() -> String {
    "hasp".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stats_interval() -> u64 {
    60
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            base_topic: default_base_topic(),
            tls: false,
            log_level: default_log_level(),
            stats_interval_secs: default_stats_interval(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Strip a trailing slash from the base topic.
    pub fn normalize(&mut self) {
        while self.base_topic.ends_with('/') {
            self.base_topic.pop();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("broker host is empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("broker port is 0".into()));
        }
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("bridge name is empty".into()));
        }
        if self.base_topic.is_empty() {
            return Err(ConfigError::Invalid("base topic is empty".into()));
        }
        if self.base_topic.contains(['+', '#']) {
            return Err(ConfigError::Invalid(format!(
                "base topic '{}' contains wildcard characters",
                self.base_topic
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_topic, "hasp");
        assert_eq!(config.port, 1883);
        assert!(!config.tls);
    }

    #[test]
    fn test_normalize_strips_trailing_slash() {
        let mut config = BridgeConfig {
            base_topic: "hasp/".into(),
            ..Default::default()
        };
        config.normalize();
        assert_eq!(config.base_topic, "hasp");
    }

    #[test]
    fn test_validation() {
        let config = BridgeConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BridgeConfig {
            base_topic: "hasp/#".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BridgeConfig {
            port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
host = "broker.local"
port = 8883
username = "panel"
password = "secret"
base_topic = "hasp/"
tls = true
"#
        )
        .expect("write");

        let config = BridgeConfig::from_file(file.path()).expect("load");
        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 8883);
        assert_eq!(config.username.as_deref(), Some("panel"));
        assert!(config.tls);
        // Trailing slash stripped during load.
        assert_eq!(config.base_topic, "hasp");
    }

    #[test]
    fn test_config_serialization() {
        let config = BridgeConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        assert!(toml_str.contains("host = \"localhost\""));
        assert!(toml_str.contains("base_topic = \"hasp\""));
    }
}
