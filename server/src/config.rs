//! Server Configuration
//!
//! Loads configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::auth::DEFAULT_TOKEN_TTL_HOURS;
use crate::bus::NatsSettings;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level name (`LOG_LEVEL`), validated at startup
    pub level: String,
    /// Destinations (`LOG_OUTPUT_PATHS`): `stdout`, `stderr` or file paths
    pub output_paths: Vec<String>,
}

/// Settings for forwarding events through the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Subject of the backend request/reply service
    pub subject: String,
    /// Routing channel stamped on every request
    pub channel: String,
    /// Reply deadline
    pub timeout: Duration,
    /// Log full request and reply bodies at debug level
    pub log_bodies: bool,
    /// Source stamped on forwarded event records; also the token display name
    pub source: String,
}

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// Service name attached to logs and metrics
    pub service_name: String,

    /// Port of the dedicated metrics listener
    pub metrics_port: u16,

    pub log: LogConfig,

    /// Bus connection settings
    pub nats: NatsSettings,

    pub bridge: BridgeConfig,

    /// HS256 key for relay credentials
    pub jwt_secret: String,

    /// Relay credential lifetime in hours (default: 72)
    pub token_ttl_hours: i64,

    /// Bearer token guarding `GET /v1/webhooks`; unset closes the endpoint
    pub webhooks_api_token: Option<String>,

    /// Forward Graph change notifications over the bridge
    pub graph_forward_notifications: bool,

    /// GitHub API token for outbound calls (not used by inbound handling)
    pub github_pat: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("service_name", &self.service_name)
            .field("metrics_port", &self.metrics_port)
            .field("log", &self.log)
            .field("nats", &self.nats)
            .field("bridge", &self.bridge)
            .field("jwt_secret", &"[redacted]")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("webhooks_api_token", &self.webhooks_api_token.as_ref().map(|_| "[redacted]"))
            .field("graph_forward_notifications", &self.graph_forward_notifications)
            .field("github_pat", &self.github_pat.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Read `key` and parse it, falling back to `default` when unset.
///
/// A value that does not parse is an error.
fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key} '{}': {e}", v.trim())),
        _ => Ok(default),
    }
}

fn parse_bool(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let nats_defaults = NatsSettings::default();
        let service_name = env::var("SERVICE_NAME").unwrap_or_else(|_| "my-go-service".into());
        let display_name = env::var("TOKEN_DISPLAY_NAME").unwrap_or_else(|_| "koksmat-emit".into());

        let bridge_timeout_ms: u64 = parse_or("BRIDGE_TIMEOUT_MS", 5000)?;
        if bridge_timeout_ms == 0 {
            bail!("BRIDGE_TIMEOUT_MS must be greater than zero");
        }

        let token_ttl_hours = parse_or("TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        if token_ttl_hours <= 0 {
            bail!("TOKEN_TTL_HOURS must be greater than zero");
        }

        let credentials = match (non_empty("NATS_USER"), non_empty("NATS_PASSWORD")) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        };

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            metrics_port: parse_or("METRICS_PORT", 9090)?,
            log: LogConfig {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
                output_paths: env::var("LOG_OUTPUT_PATHS")
                    .unwrap_or_else(|_| "stdout".into())
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            },
            nats: NatsSettings {
                url: env::var("NATS_URL").unwrap_or(nats_defaults.url),
                name: service_name.clone(),
                credentials,
                reconnect_wait: Duration::from_millis(parse_or("NATS_RECONNECT_WAIT_MS", 2000)?),
                max_reconnects: parse_or("NATS_MAX_RECONNECTS", nats_defaults.max_reconnects)?,
                connect_timeout: Duration::from_secs(parse_or("NATS_CONNECT_TIMEOUT_SECS", 5)?),
            },
            bridge: BridgeConfig {
                subject: env::var("BUS_SUBJECT").unwrap_or_else(|_| "magic-mix.app".into()),
                channel: env::var("BUS_CHANNEL").unwrap_or_else(|_| "noma2".into()),
                timeout: Duration::from_millis(bridge_timeout_ms),
                log_bodies: parse_bool("BRIDGE_LOG_BODIES"),
                source: display_name,
            },
            jwt_secret: non_empty("JWT_SECRET").context("JWT_SECRET must be set")?,
            token_ttl_hours,
            webhooks_api_token: non_empty("WEBHOOKS_API_TOKEN"),
            graph_forward_notifications: parse_bool("GRAPH_FORWARD_NOTIFICATIONS"),
            github_pat: non_empty("GITHUB_PAT"),
            service_name,
        })
    }

    /// Create a default configuration for testing.
    ///
    /// Tests run against the in-memory bus, so the NATS settings are never
    /// used to connect.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            service_name: "emit-test".into(),
            metrics_port: 9090,
            log: LogConfig {
                level: "debug".into(),
                output_paths: vec!["stdout".into()],
            },
            nats: NatsSettings::default(),
            bridge: BridgeConfig {
                subject: "magic-mix.app".into(),
                channel: "noma2".into(),
                timeout: Duration::from_secs(2),
                log_bodies: true,
                source: "koksmat-emit".into(),
            },
            jwt_secret: "test-secret".into(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            webhooks_api_token: Some("test-api-token".into()),
            graph_forward_notifications: false,
            github_pat: None,
        }
    }
}
