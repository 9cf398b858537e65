use crate::{Error, Result};
use crate::protocol::{DEFAULT_PEER_BANDWIDTH, DEFAULT_WINDOW_SIZE};

/// Smallest chunk size the server will announce
pub const MIN_CHUNK_SIZE: u32 = 128;

/// Largest chunk size the server will announce
pub const MAX_CHUNK_SIZE: u32 = 65536;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,

    /// Port to bind; 0 picks an ephemeral port
    pub port: u16,

    pub max_connections: usize,

    /// Chunk size announced after `connect`
    pub chunk_size: u32,

    /// Window acknowledgement size announced after `connect`
    pub window_ack_size: u32,

    /// Peer bandwidth announced after `connect`
    pub peer_bandwidth: u32,

    /// Packets a publisher may queue before the oldest is dropped
    pub media_queue_capacity: usize,

    /// Packets queued per viewer before new ones are dropped for that viewer
    pub viewer_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 1935,
            max_connections: 1000,
            chunk_size: 1024,
            window_ack_size: DEFAULT_WINDOW_SIZE,
            peer_bandwidth: DEFAULT_PEER_BANDWIDTH,
            media_queue_capacity: 1024,
            viewer_queue_capacity: 1024,
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Address string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("Host must not be empty"));
        }

        if self.max_connections == 0 {
            return Err(Error::config("Invalid max_connections: 0"));
        }

        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::config(format!("Chunk size must be at least {}", MIN_CHUNK_SIZE)));
        }

        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::config(format!("Chunk size must not exceed {}", MAX_CHUNK_SIZE)));
        }

        if self.media_queue_capacity == 0 || self.viewer_queue_capacity == 0 {
            return Err(Error::config("Queue capacities must be non-zero"));
        }

        Ok(())
    }
}

/// Builder for ServerConfig
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        ServerConfigBuilder {
            config: ServerConfig::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn chunk_size(mut self, size: u32) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn window_ack_size(mut self, size: u32) -> Self {
        self.config.window_ack_size = size;
        self
    }

    pub fn peer_bandwidth(mut self, size: u32) -> Self {
        self.config.peer_bandwidth = size;
        self
    }

    pub fn media_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.media_queue_capacity = capacity;
        self
    }

    pub fn viewer_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.viewer_queue_capacity = capacity;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 1935);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.media_queue_capacity, 1024);
        assert_eq!(config.bind_address(), "0.0.0.0:1935");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(ServerConfig::builder().chunk_size(100).build().is_err());
        assert!(ServerConfig::builder().chunk_size(100_000).build().is_err());
        assert!(ServerConfig::builder().max_connections(0).build().is_err());
        assert!(ServerConfig::builder().host("").build().is_err());
        assert!(ServerConfig::builder().media_queue_capacity(0).build().is_err());
        assert!(ServerConfig::builder().port(0).build().is_ok());

        let config = ServerConfig::builder()
            .host("127.0.0.1")
            .port(19350)
            .chunk_size(4096)
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 4096);
    }

    #[test]
    fn test_config_errors_are_configuration() {
        let err = ServerConfig::builder().max_connections(0).build().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
