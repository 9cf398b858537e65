use crate::handlers::CommandHandlerRegistry;
use crate::processing::{FlvTagTransform, PayloadTransform};
use crate::server::config::ServerConfig;
use crate::server::registry::{ChannelRegistry, RegistryHandle};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// State shared by every connection of one server.
pub struct ServerContext {
    config: Arc<ServerConfig>,
    registry: RegistryHandle,
    handlers: Arc<CommandHandlerRegistry>,
    transform: Arc<dyn PayloadTransform>,
    connection_counter: AtomicU64,
    active_connections: Arc<AtomicUsize>,
}

/// Holds one of the `max_connections` slots until dropped
#[derive(Debug)]
pub struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ServerContext {
    /// Spawns the channel registry; must be called inside a tokio runtime
    pub fn new(config: Arc<ServerConfig>) -> Self {
        ServerContext {
            config,
            registry: ChannelRegistry::spawn(),
            handlers: Arc::new(CommandHandlerRegistry::new()),
            transform: Arc::new(FlvTagTransform),
            connection_counter: AtomicU64::new(0),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn handlers(&self) -> &Arc<CommandHandlerRegistry> {
        &self.handlers
    }

    pub fn transform(&self) -> &Arc<dyn PayloadTransform> {
        &self.transform
    }

    /// Next connection id, starting at 1
    pub fn next_connection_id(&self) -> u64 {
        self.connection_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reserve a connection slot, or None when `max_connections` are open
    pub fn try_acquire_slot(&self) -> Option<ConnectionSlot> {
        let max = self.config.max_connections;
        self.active_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (active < max).then_some(active + 1)
            })
            .ok()
            .map(|_| ConnectionSlot {
                active: self.active_connections.clone(),
            })
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}
