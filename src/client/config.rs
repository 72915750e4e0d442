//! Client configuration options.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::{Error, Result};

/// Environment variable redirecting every request to a test server.
pub const TEST_HOST_ENV: &str = "HUB_TEST_HOST";

/// Configuration for the hub client.
///
/// # Example
///
/// ```
/// use hub_rs::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_cache_ttl(Duration::from_secs(60))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Time to wait for a response once connected
    pub timeout: Duration,
    /// Time to wait for a connection
    pub connect_timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Maximum age of a usable cache entry; zero disables the cache
    pub cache_ttl: Duration,
    /// Cache directory; the temp-directory default when `None`
    pub cache_dir: Option<PathBuf>,
    /// Send every request to this scheme and authority instead
    pub override_url: Option<Url>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("hub-rs/{}", env!("CARGO_PKG_VERSION")),
            cache_ttl: Duration::ZERO,
            cache_dir: None,
            override_url: None,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration plus `HUB_TEST_HOST`, if set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(TEST_HOST_ENV) {
            if !raw.is_empty() {
                config.override_url = Some(parse_override(&raw)?);
            }
        }
        Ok(config)
    }

    /// Set the response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable the response cache with the given TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Store cache entries under `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Redirect requests to a test server.
    pub fn with_override_url(mut self, url: Url) -> Self {
        self.override_url = Some(url);
        self
    }
}

fn parse_override(raw: &str) -> Result<Url> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    Url::parse(&candidate)
        .map_err(|e| Error::Config(format!("invalid {} {:?}: {}", TEST_HOST_ENV, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.cache_ttl.is_zero());
        assert!(config.user_agent.starts_with("hub-rs/"));
        assert!(config.override_url.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new()
            .with_cache_ttl(Duration::from_secs(60))
            .with_cache_dir("/tmp/hub-test")
            .with_user_agent("test/1.0");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/hub-test")));
        assert_eq!(config.user_agent, "test/1.0");
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("127.0.0.1:8080").unwrap().as_str(),
            "http://127.0.0.1:8080/"
        );
        assert_eq!(
            parse_override("https://localhost:9443").unwrap().port(),
            Some(9443)
        );
        assert!(parse_override("http://[bad").is_err());
    }
}
