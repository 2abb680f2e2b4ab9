/*!
 # Daemon configuration

 The daemon reads a small JSON file at startup:

 ```json
 { "port": 8080, "bridge": "192.168.1.50", "groups": 4, "pacing_ms": 200 }
 ```

 `groups` and `pacing_ms` are optional. A bridge address without a port uses
 the bridge's default UDP port.
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::bridge::{DEFAULT_BRIDGE_PORT, MAX_GROUPS};

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "milight-daemon.conf";

/// Default number of groups
pub const DEFAULT_GROUPS: u8 = 4;

/// Default delay between groups during a broadcast, in milliseconds
pub const DEFAULT_PACING_MS: u64 = 200;

/// Invalid or unreadable configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for [`Config`]
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Bridge address is missing
    #[error("bridge address must not be empty")]
    MissingBridge,

    /// Group count outside what the bridge can address
    #[error("invalid group count {0}: must be between 1 and {max}", max = MAX_GROUPS)]
    GroupCount(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,
    /// Bridge host, optionally with `:port`
    pub bridge: String,
    /// Number of groups to address
    #[serde(default = "default_groups")]
    pub groups: u8,
    /// Delay between groups during a broadcast
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_groups() -> u8 {
    DEFAULT_GROUPS
}

fn default_pacing_ms() -> u64 {
    DEFAULT_PACING_MS
}

impl Config {
    /// Reads and validates a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parses and validates a configuration document
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.trim().is_empty() {
            return Err(ConfigError::MissingBridge);
        }
        if self.groups == 0 || self.groups > MAX_GROUPS {
            return Err(ConfigError::GroupCount(self.groups));
        }
        Ok(())
    }

    /// Bridge address as `host:port`
    pub fn bridge_addr(&self) -> String {
        let bridge = self.bridge.trim();
        let has_port = bridge
            .rsplit_once(':')
            .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
        if has_port {
            bridge.to_string()
        } else {
            format!("{bridge}:{DEFAULT_BRIDGE_PORT}")
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_json(r#"{"port": 8080, "bridge": "10.0.0.2"}"#).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.groups, DEFAULT_GROUPS);
        assert_eq!(config.pacing(), Duration::from_millis(200));
        assert_eq!(config.bridge_addr(), "10.0.0.2:8899");
    }

    #[test]
    fn explicit_bridge_port_is_kept() {
        let config =
            Config::from_json(r#"{"port": 1, "bridge": "bridge.lan:5987", "pacing_ms": 50}"#)
                .unwrap();
        assert_eq!(config.bridge_addr(), "bridge.lan:5987");
        assert_eq!(config.pacing(), Duration::from_millis(50));
    }

    #[test]
    fn rejects_bad_group_count() {
        let err = Config::from_json(r#"{"port": 1, "bridge": "b", "groups": 5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::GroupCount(5)));
        let err = Config::from_json(r#"{"port": 1, "bridge": "b", "groups": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::GroupCount(0)));
    }

    #[test]
    fn rejects_missing_fields_and_empty_bridge() {
        assert!(matches!(
            Config::from_json(r#"{"port": 1}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"port": 1, "bridge": " "}"#),
            Err(ConfigError::MissingBridge)
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load("/nonexistent/milight-daemon.conf").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
