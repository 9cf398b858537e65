use crate::connection::Connection;
use crate::server::config::ServerConfig;
use crate::server::context::ServerContext;
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};

const LISTEN_BACKLOG: u32 = 1024;

pub struct RtmpServer {
    /// Server configuration
    config: Arc<ServerConfig>,

    /// Registry, handlers and connection accounting shared with every connection
    context: Arc<ServerContext>,
}

impl RtmpServer {
    /// Create new server; must be called inside a tokio runtime
    pub fn new(config: ServerConfig) -> Self {
        let config = Arc::new(config);
        let context = Arc::new(ServerContext::new(config.clone()));
        RtmpServer { config, context }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn context(&self) -> Arc<ServerContext> {
        self.context.clone()
    }

    /// Bind the configured address with SO_REUSEADDR
    pub async fn bind(&self) -> Result<TcpListener> {
        self.config.validate()?;
        let addr = self.config.bind_address();
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::config(format!("Invalid address {}: {}", addr, e)))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .map_err(|e| Error::connection(format!("Failed to bind {}: {}", addr, e)))?;
        Ok(socket.listen(LISTEN_BACKLOG)?)
    }

    /// Bind and accept connections until the task is dropped
    pub async fn listen(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept loop; each connection runs on its own task
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("RTMP server listening on {}", listener.local_addr()?);

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept error: {}", e);
                    continue;
                }
            };

            let Some(slot) = self.context.try_acquire_slot() else {
                warn!(
                    "Connection limit of {} reached, rejecting {}",
                    self.config.max_connections, peer_addr
                );
                drop(stream);
                continue;
            };

            if let Err(e) = stream.set_nodelay(true) {
                debug!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
            }

            let id = self.context.next_connection_id();
            let context = self.context.clone();
            info!("Connection {} accepted from {}", id, peer_addr);

            tokio::spawn(async move {
                let _slot = slot;
                match Connection::serve(id, peer_addr.to_string(), context, stream).await {
                    Ok(()) => info!("Connection {} from {} finished", id, peer_addr),
                    Err(e) => warn!("Connection {} from {} ended with error: {}", id, peer_addr, e),
                }
            });
        }
    }
}
