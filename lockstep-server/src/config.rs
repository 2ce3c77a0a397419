//! lockstep-server specific configuration

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Server configuration
///
/// Loaded from an optional TOML file; command-line flags override.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the HTTP server binds to
    pub port: u16,
    /// Per-room event channel capacity before slow SSE subscribers lag
    pub event_channel_capacity: usize,
    /// Heartbeat interval advertised to clients, milliseconds
    pub heartbeat_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5750,
            event_channel_capacity: 100,
            heartbeat_interval_ms: 3000,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// `path` is None
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| {
                    Error::Config(format!("failed to read {}: {}", p.display(), e))
                })?;
                toml::from_str(&text)
                    .map_err(|e| Error::Config(format!("failed to parse {}: {}", p.display(), e)))
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 5750);
        assert_eq!(config.event_channel_capacity, 100);
        assert_eq!(config.heartbeat_interval_ms, 3000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("port = 8080").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.event_channel_capacity, 100);
    }
}
