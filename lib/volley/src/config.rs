//! Transport configuration types.

use std::time::Duration;

/// Configuration for [`HyperTransport`](crate::HyperTransport).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Time allowed until the response head arrives.
    pub timeout: Duration,
    /// Time allowed for reading the body; falls back to `timeout`.
    pub body_timeout: Option<Duration>,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Offer HTTP/2 through ALPN on TLS connections.
    pub http2: bool,
    /// Maximum idle connections kept per host for direct requests.
    pub pool_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            body_timeout: None,
            connect_timeout: Duration::from_secs(10),
            http2: true,
            pool_idle_per_host: 32,
        }
    }
}

impl TransportConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    /// Effective body read timeout.
    #[must_use]
    pub fn body_timeout(&self) -> Duration {
        self.body_timeout.unwrap_or(self.timeout)
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    timeout: Option<Duration>,
    body_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    http2: Option<bool>,
    pool_idle_per_host: Option<usize>,
}

impl TransportConfigBuilder {
    /// Set the response head timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the body read timeout.
    #[must_use]
    pub const fn body_timeout(mut self, timeout: Duration) -> Self {
        self.body_timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Restrict TLS connections to HTTP/1.1.
    #[must_use]
    pub const fn http1_only(mut self) -> Self {
        self.http2 = Some(false);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            body_timeout: self.body_timeout.or(defaults.body_timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            http2: self.http2.unwrap_or(defaults.http2),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.body_timeout(), Duration::from_secs(30));
        assert!(config.http2);
    }

    #[test]
    fn body_timeout_follows_timeout_unless_set() {
        let config = TransportConfig::builder()
            .timeout(Duration::from_millis(250))
            .build();
        assert_eq!(config.body_timeout(), Duration::from_millis(250));

        let config = TransportConfig::builder()
            .timeout(Duration::from_millis(250))
            .body_timeout(Duration::from_secs(5))
            .http1_only()
            .build();
        assert_eq!(config.body_timeout(), Duration::from_secs(5));
        assert!(!config.http2);
        assert_eq!(config.pool_idle_per_host, 32);
    }
}
