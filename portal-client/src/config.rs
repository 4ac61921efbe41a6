//! Client configuration
//!
//! Loaded from the TOML config file under the standard config directory,
//! with every field optional; CLI flags override the loaded values.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use portal_utils::{paths, PortalError, Result};

/// Connection settings for a portal host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Host name or address of the portal host
    pub host: String,
    /// Port the host serves both the ticket endpoint and the WebSocket on
    pub port: u16,
    /// User name sent with the ticket request
    pub user: String,
    /// Password sent with the ticket request
    pub pass: String,
    /// Use wss/https instead of ws/http
    pub secure: bool,
    /// Delay between reconnection attempts, in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 2000,
            user: String::new(),
            pass: String::new(),
            secure: false,
            reconnect_delay_ms: 3000,
        }
    }
}

impl ClientConfig {
    /// Load from the default config file, falling back to defaults when the
    /// file is missing or unreadable
    pub fn load() -> Self {
        let path = paths::config_file();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }

    /// Load from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| PortalError::config(e.to_string()))
    }

    /// WebSocket endpoint URL
    pub fn ws_endpoint(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// HTTP endpoint URL for ticket requests
    pub fn http_endpoint(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Delay between reconnection attempts
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 2000);
        assert!(!config.secure);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(3000));
    }

    #[test]
    fn test_endpoints() {
        let mut config = ClientConfig::default();
        config.host = "example.com".into();
        config.port = 8080;
        assert_eq!(config.ws_endpoint(), "ws://example.com:8080");
        assert_eq!(config.http_endpoint(), "http://example.com:8080");
        config.secure = true;
        assert_eq!(config.ws_endpoint(), "wss://example.com:8080");
        assert_eq!(config.http_endpoint(), "https://example.com:8080");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"10.0.0.5\"\nuser = \"admin\"").unwrap();
        let config = ClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.user, "admin");
        assert_eq!(config.port, 2000);
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hostname = \"oops\"").unwrap();
        assert!(ClientConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClientConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(err.is_err());
    }
}
