//! NATS connection configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for NATS connections with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct NatsConfig {
    /// Broker URL (comma-separated for clustering)
    #[cfg_attr(
        feature = "config",
        arg(long = "broker-url", env = "BROKER_URL", default_value = DEFAULT_URL)
    )]
    pub nats_url: String,

    /// Authentication token
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    pub nats_token: Option<String>,

    /// Client connection name for debugging and monitoring
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-client-name", env = "NATS_CLIENT_NAME")
    )]
    pub nats_client_name: Option<String>,

    /// Connection timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-connect-timeout", env = "NATS_CONNECT_TIMEOUT_SECS")
    )]
    pub nats_connect_timeout: Option<u64>,

    /// Maximum number of reconnection attempts (0 = unlimited)
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-max-reconnects", env = "NATS_MAX_RECONNECTS")
    )]
    pub nats_max_reconnects: Option<usize>,
}

// Default values
const DEFAULT_URL: &str = "nats://127.0.0.1:4222";
const DEFAULT_NAME: &str = "muse";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECONNECT_DELAY_MILLIS: u64 = 500;
const DEFAULT_PING_INTERVAL_SECS: u64 = 30;

/// Ceiling of the reconnect backoff.
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

impl Default for NatsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl NatsConfig {
    /// Create a new configuration for the given server URL(s).
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            nats_url: server_url.into(),
            nats_token: None,
            nats_client_name: None,
            nats_connect_timeout: None,
            nats_max_reconnects: None,
        }
    }

    /// Returns the client name, using the default if not set.
    #[inline]
    pub fn name(&self) -> &str {
        self.nats_client_name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Returns the server URLs (splits comma-separated URLs).
    pub fn servers(&self) -> Vec<&str> {
        self.nats_url
            .split(',')
            .map(str::trim)
            .filter(|server| !server.is_empty())
            .collect()
    }

    /// Returns the token, ignoring blank values.
    pub fn token(&self) -> Option<&str> {
        self.nats_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Returns the connection timeout.
    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.nats_connect_timeout
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Returns the ping interval.
    #[inline]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(DEFAULT_PING_INTERVAL_SECS)
    }

    /// Returns the max reconnects as Option (`None` means unlimited).
    #[inline]
    pub fn max_reconnects_option(&self) -> Option<usize> {
        self.nats_max_reconnects.filter(|max| *max > 0)
    }

    /// Delay before the given reconnect attempt.
    ///
    /// Doubles from half a second and is capped at [`MAX_RECONNECT_DELAY`].
    pub fn reconnect_delay(attempts: usize) -> Duration {
        let factor = 2_u64.saturating_pow(attempts.min(32) as u32);
        Duration::from_millis(DEFAULT_RECONNECT_DELAY_MILLIS.saturating_mul(factor))
            .min(MAX_RECONNECT_DELAY)
    }

    /// Set server URL(s).
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.nats_url = url.into();
        self
    }

    /// Set the authentication token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.nats_token = Some(token.into());
        self
    }

    /// Set the client connection name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.nats_client_name = Some(name.into());
        self
    }

    /// Set the connection timeout in seconds.
    #[must_use]
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.nats_connect_timeout = Some(secs);
        self
    }

    /// Set maximum reconnection attempts (0 for unlimited).
    #[must_use]
    pub fn with_max_reconnects(mut self, max_reconnects: usize) -> Self {
        self.nats_max_reconnects = Some(max_reconnects);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let servers = self.servers();
        if servers.is_empty() {
            return Err(Error::invalid_config(
                "at least one broker URL must be provided",
            ));
        }

        for server in servers {
            if !server.starts_with("nats://") && !server.starts_with("tls://") {
                return Err(Error::invalid_config(format!(
                    "invalid broker URL format: {server}"
                )));
            }
        }

        if self.nats_connect_timeout == Some(0) {
            return Err(Error::invalid_config("connect timeout must be non-zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NatsConfig::default();
        assert_eq!(config.servers(), vec!["nats://127.0.0.1:4222"]);
        assert_eq!(config.name(), "muse");
        assert_eq!(config.token(), None);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_reconnects_option(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder() {
        let config = NatsConfig::new("nats://localhost:4222")
            .with_token("secret")
            .with_name("worker")
            .with_connect_timeout_secs(5)
            .with_max_reconnects(5);

        assert_eq!(config.token(), Some("secret"));
        assert_eq!(config.name(), "worker");
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_reconnects_option(), Some(5));
        assert_eq!(
            config.with_max_reconnects(0).max_reconnects_option(),
            None
        );
    }

    #[test]
    fn blank_token_is_ignored() {
        assert_eq!(NatsConfig::default().with_token("  ").token(), None);
    }

    #[test]
    fn validation() {
        assert!(NatsConfig::new("").validate().is_err());
        assert!(NatsConfig::new("redis://localhost:6379").validate().is_err());
        assert!(
            NatsConfig::default()
                .with_connect_timeout_secs(0)
                .validate()
                .is_err()
        );
        assert!(
            NatsConfig::new("nats://a:4222, tls://b:4222")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn reconnect_backoff_is_capped() {
        assert_eq!(NatsConfig::reconnect_delay(0), Duration::from_millis(500));
        assert_eq!(NatsConfig::reconnect_delay(1), Duration::from_secs(1));
        assert_eq!(NatsConfig::reconnect_delay(3), Duration::from_secs(4));
        assert_eq!(NatsConfig::reconnect_delay(10), MAX_RECONNECT_DELAY);
        assert_eq!(NatsConfig::reconnect_delay(1000), MAX_RECONNECT_DELAY);
    }
}
