use crate::connection::Shutdown;
use crate::stream::ViewerHandle;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Which side of a channel a connection is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Publisher,
    Viewer,
}

/// Identity and quit signal of a publishing connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: u64,
    shutdown: Shutdown,
}

impl ConnectionHandle {
    pub fn new(id: u64, shutdown: Shutdown) -> Self {
        ConnectionHandle { id, shutdown }
    }

    /// Ask the connection to close
    pub fn close(&self) {
        self.shutdown.trigger();
    }
}

/// One publisher slot and the viewers attached to a stream name.
#[derive(Debug)]
pub struct Channel {
    name: String,
    publisher: Option<ConnectionHandle>,
    viewers: Vec<ViewerHandle>,
    viewer_count: watch::Sender<usize>,
}

/// Channel as shared between the registry and the broadcast task
pub type SharedChannel = Arc<RwLock<Channel>>;

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        let (viewer_count, _) = watch::channel(0);
        Channel {
            name: name.into(),
            publisher: None,
            viewers: Vec::new(),
            viewer_count,
        }
    }

    pub fn shared(self) -> SharedChannel {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn publisher_id(&self) -> Option<u64> {
        self.publisher.as_ref().map(|p| p.id)
    }

    /// Install `publisher`, returning the one it replaced
    pub fn set_publisher(&mut self, publisher: ConnectionHandle) -> Option<ConnectionHandle> {
        self.publisher.replace(publisher)
    }

    /// Clear the publisher slot if it still holds `connection_id`
    pub fn clear_publisher(&mut self, connection_id: u64) -> bool {
        if self.publisher_id() == Some(connection_id) {
            self.publisher = None;
            true
        } else {
            false
        }
    }

    pub fn add_viewer(&mut self, viewer: ViewerHandle) {
        self.viewers.push(viewer);
        self.viewer_count.send_replace(self.viewers.len());
    }

    pub fn remove_viewer(&mut self, connection_id: u64) -> bool {
        let before = self.viewers.len();
        self.viewers.retain(|v| v.connection_id != connection_id);
        self.viewer_count.send_replace(self.viewers.len());
        self.viewers.len() != before
    }

    pub fn viewer_ids(&self) -> Vec<u64> {
        self.viewers.iter().map(|v| v.connection_id).collect()
    }

    /// Copy of the current viewer set
    pub fn viewer_snapshot(&self) -> Vec<ViewerHandle> {
        self.viewers.clone()
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// Follow the viewer count as it changes
    pub fn subscribe_viewers(&self) -> watch::Receiver<usize> {
        self.viewer_count.subscribe()
    }

    /// No publisher and no viewers
    pub fn is_idle(&self) -> bool {
        self.publisher.is_none() && self.viewers.is_empty()
    }
}
