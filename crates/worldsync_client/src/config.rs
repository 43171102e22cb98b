//! Configuration for the sync client.

use std::time::Duration;

/// Configuration for client operations.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sync server address as `host:port`.
    pub server_addr: String,
    /// Branch this client pushes to and pulls from.
    pub branch: String,
    /// How long to wait for a correlated response.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a new client configuration.
    pub fn new(server_addr: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            branch: branch.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:9090", "main")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server_addr, "127.0.0.1:9090");
        assert_eq!(config.branch, "main");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_builder() {
        let config =
            ClientConfig::new("localhost:7000", "creative").with_timeout(Duration::from_secs(1));
        assert_eq!(config.server_addr, "localhost:7000");
        assert_eq!(config.branch, "creative");
        assert_eq!(config.timeout, Duration::from_secs(1));
    }
}
