//! Transport configuration.

use std::time::Duration;

/// Configuration for [`ReqwestTransport`](crate::ReqwestTransport).
///
/// These are the transport's own defaults; the controller adds no timeouts
/// or retries on top of them.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Whether to enable cookie storage.
    pub cookies_enabled: bool,
    /// Default user agent.
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            max_redirects: 10,
            cookies_enabled: false,
            user_agent: Some(format!("magic-request/{} (Rust)", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl TransportConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Enable cookie storage.
    pub fn cookies(mut self) -> Self {
        self.cookies_enabled = true;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Send no User-Agent header.
    pub fn no_user_agent(mut self) -> Self {
        self.user_agent = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.max_redirects, 10);
        assert!(!config.cookies_enabled);
        assert!(config.user_agent.unwrap().starts_with("magic-request/"));
    }

    #[test]
    fn test_builder_chain() {
        let config = TransportConfig::new()
            .timeout(Duration::from_secs(5))
            .max_redirects(3)
            .cookies()
            .no_user_agent();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.max_redirects, 3);
        assert!(config.cookies_enabled);
        assert!(config.user_agent.is_none());
        assert!(config.no_timeout().timeout.is_none());
    }
}
