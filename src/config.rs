//! Server configuration from environment variables.

use std::env;
use std::time::Duration;

/// Settings for the `web` binary. Unset, blank or unparsable values fall back to defaults.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Interval of the background consistency sweep; `None` disables it.
    pub sweep_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_SECS)),
        }
    }
}

const DEFAULT_SWEEP_SECS: u64 = 300;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl ServerConfig {
    /// Read `HOST`, `PORT` and `BRACKET_SWEEP_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(env_value)
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let sweep_interval = match lookup("BRACKET_SWEEP_SECS").and_then(|s| s.parse::<u64>().ok()) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.sweep_interval,
        };
        Self {
            host,
            port,
            sweep_interval,
        }
    }
}
