// Launch configuration
//
// Taken from the `launch` request arguments of the client's launch.json entry

use romlua_client::connection::{DEFAULT_HOST, DEFAULT_PORT};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Entry script, shown until the first stop
    #[serde(default)]
    pub program: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            program: None,
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl LaunchConfig {
    /// Missing or null arguments fall back to the defaults
    pub fn from_arguments(arguments: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if arguments.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(arguments.clone())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = LaunchConfig::from_arguments(&json!({})).unwrap();
        assert_eq!(config, LaunchConfig::default());
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4712);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));

        assert_eq!(
            LaunchConfig::from_arguments(&serde_json::Value::Null).unwrap(),
            LaunchConfig::default()
        );
    }

    #[test]
    fn test_overrides_and_unknown_fields() {
        let config = LaunchConfig::from_arguments(&json!({
            "type": "romlua",
            "request": "launch",
            "program": "${workspaceFolder}/main.lua",
            "host": "10.0.0.2",
            "port": 5000,
            "connectTimeoutMs": 250
        }))
        .unwrap();

        assert_eq!(config.program.as_deref(), Some("${workspaceFolder}/main.lua"));
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 5000);
        assert_eq!(config.connect_timeout_ms, 250);
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!(LaunchConfig::from_arguments(&json!({"port": "high"})).is_err());
        assert!(LaunchConfig::from_arguments(&json!({"port": 70000})).is_err());
    }
}
