//! Environment-driven configuration for the relay and the terminal client

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ADK_API_URL: &str = "http://localhost:8000";
const DEFAULT_RELAY_URL: &str = "http://localhost:3000";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the upstream ADK service
    pub adk_api_url: String,
    pub port: u16,
    /// Expose the development sign-in route
    pub dev_auth: bool,
    /// Connect timeout for upstream requests. Bodies are streamed without a deadline.
    pub connect_timeout: Duration,
}

impl RelayConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            adk_api_url: std::env::var("ADK_API_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map_or_else(|| DEFAULT_ADK_API_URL.to_string(), |url| trim_base(&url)),
            port: parse_env("ADK_CHAT_PORT", DEFAULT_PORT),
            dev_auth: parse_env("ADK_CHAT_DEV_AUTH", false),
            connect_timeout: Duration::from_secs(parse_env(
                "ADK_CHAT_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            adk_api_url: DEFAULT_ADK_API_URL.to_string(),
            port: DEFAULT_PORT,
            dev_auth: false,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Terminal client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    /// Session token presented to the relay
    pub token: Option<String>,
    /// SQLite file holding the persisted conversation list
    pub state_path: PathBuf,
}

impl ClientConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let state_path = std::env::var("ADK_CHAT_STATE_PATH").map_or_else(
            |_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(format!("{home}/.adk-chat/state.db"))
            },
            PathBuf::from,
        );

        Self {
            relay_url: std::env::var("ADK_CHAT_RELAY_URL")
                .map_or_else(|_| DEFAULT_RELAY_URL.to_string(), |url| trim_base(&url)),
            token: std::env::var("ADK_CHAT_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            state_path,
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = raw, "Ignoring unparseable setting, using default");
        default
    })
}
