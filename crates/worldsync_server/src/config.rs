//! Server configuration.

use std::net::SocketAddr;

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the TCP sync endpoint binds to.
    pub tcp_addr: SocketAddr,
    /// Address the read-only HTTP API binds to.
    pub http_addr: SocketAddr,
}

impl ServerConfig {
    /// Creates a configuration with the given TCP bind address.
    pub fn new(tcp_addr: SocketAddr) -> Self {
        Self {
            tcp_addr,
            http_addr: SocketAddr::from(([127, 0, 0, 1], 9091)),
        }
    }

    /// Sets the TCP bind address.
    pub fn with_tcp_addr(mut self, addr: SocketAddr) -> Self {
        self.tcp_addr = addr;
        self
    }

    /// Sets the HTTP bind address.
    pub fn with_http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 9090)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_loopback() {
        let config = ServerConfig::default();
        assert!(config.tcp_addr.ip().is_loopback());
        assert!(config.http_addr.ip().is_loopback());
        assert_eq!(config.tcp_addr.port(), 9090);
        assert_eq!(config.http_addr.port(), 9091);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::default()
            .with_tcp_addr("127.0.0.1:7000".parse().unwrap())
            .with_http_addr("127.0.0.1:7001".parse().unwrap());
        assert_eq!(config.tcp_addr.port(), 7000);
        assert_eq!(config.http_addr.port(), 7001);
    }
}
