use crate::server::channel::{Channel, ConnectionHandle, Role, SharedChannel};
use crate::stream::ViewerHandle;
use crate::{Error, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

/// Requests queued to the registry task
#[derive(Debug)]
pub enum RegistryRequest {
    Publish {
        name: String,
        publisher: ConnectionHandle,
        ack: oneshot::Sender<SharedChannel>,
    },
    Play {
        name: String,
        viewer: ViewerHandle,
        ack: oneshot::Sender<SharedChannel>,
    },
    Leave {
        name: String,
        connection_id: u64,
        role: Role,
        ack: oneshot::Sender<bool>,
    },
    Info {
        name: String,
        reply: oneshot::Sender<Option<ChannelInfo>>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Point-in-time view of a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    pub publisher: Option<u64>,
    pub viewers: Vec<u64>,
}

/// Owns the stream-name table. Every mutation goes through its request queue.
pub struct ChannelRegistry {
    channels: HashMap<String, SharedChannel>,
    requests: mpsc::Receiver<RegistryRequest>,
}

/// Cloneable sender side of the registry queue
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryRequest>,
}

const REQUEST_QUEUE_CAPACITY: usize = 256;

impl ChannelRegistry {
    /// Start the registry task. It stops when the last handle is dropped.
    pub fn spawn() -> RegistryHandle {
        let (sender, requests) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let registry = ChannelRegistry {
            channels: HashMap::new(),
            requests,
        };
        tokio::spawn(registry.run());
        RegistryHandle { sender }
    }

    async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            self.handle(request).await;
        }
        debug!("Channel registry stopped");
    }

    async fn handle(&mut self, request: RegistryRequest) {
        match request {
            RegistryRequest::Publish { name, publisher, ack } => {
                let channel = self.channel_or_insert(&name);
                let publisher_id = publisher.id;
                let evicted = channel.write().await.set_publisher(publisher);
                if let Some(old) = evicted {
                    info!(
                        "Connection {} replaces connection {} as publisher of {}",
                        publisher_id, old.id, name
                    );
                    old.close();
                } else {
                    info!("Connection {} publishes {}", publisher_id, name);
                }
                let _ = ack.send(channel);
            }
            RegistryRequest::Play { name, viewer, ack } => {
                let channel = self.channel_or_insert(&name);
                info!("Connection {} plays {}", viewer.connection_id, name);
                channel.write().await.add_viewer(viewer);
                let _ = ack.send(channel);
            }
            RegistryRequest::Leave {
                name,
                connection_id,
                role,
                ack,
            } => {
                let removed = self.leave(&name, connection_id, role).await;
                let _ = ack.send(removed);
            }
            RegistryRequest::Info { name, reply } => {
                let info = match self.channels.get(&name) {
                    Some(channel) => {
                        let channel = channel.read().await;
                        Some(ChannelInfo {
                            name: channel.name().to_string(),
                            publisher: channel.publisher_id(),
                            viewers: channel.viewer_ids(),
                        })
                    }
                    None => None,
                };
                let _ = reply.send(info);
            }
            RegistryRequest::Count { reply } => {
                let _ = reply.send(self.channels.len());
            }
        }
    }

    fn channel_or_insert(&mut self, name: &str) -> SharedChannel {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Creating channel {}", name);
                Channel::new(name).shared()
            })
            .clone()
    }

    async fn leave(&mut self, name: &str, connection_id: u64, role: Role) -> bool {
        let Some(channel) = self.channels.get(name).cloned() else {
            warn!("Connection {} left unknown channel {}", connection_id, name);
            return false;
        };

        let mut channel = channel.write().await;
        let removed = match role {
            Role::Publisher => channel.clear_publisher(connection_id),
            Role::Viewer => channel.remove_viewer(connection_id),
        };
        if removed {
            info!("Connection {} left {} as {:?}", connection_id, name, role);
        } else if role == Role::Viewer {
            warn!("Viewer {} not found in channel {}", connection_id, name);
        } else {
            debug!("Publisher {} of {} was already replaced", connection_id, name);
        }

        if channel.is_idle() {
            drop(channel);
            self.channels.remove(name);
            info!("Channel {} removed", name);
        }
        removed
    }
}

impl RegistryHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> RegistryRequest) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::connection("Channel registry is not running"))?;
        rx.await
            .map_err(|_| Error::connection("Channel registry dropped the request"))
    }

    /// Bind `publisher` to `name`, evicting any current publisher
    pub async fn register_publisher(&self, name: &str, publisher: ConnectionHandle) -> Result<SharedChannel> {
        self.request(|ack| RegistryRequest::Publish {
            name: name.to_string(),
            publisher,
            ack,
        })
        .await
    }

    /// Attach `viewer` to `name`, creating the channel if needed
    pub async fn register_viewer(&self, name: &str, viewer: ViewerHandle) -> Result<SharedChannel> {
        self.request(|ack| RegistryRequest::Play {
            name: name.to_string(),
            viewer,
            ack,
        })
        .await
    }

    /// Detach a connection; true if it was still attached
    pub async fn unregister(&self, name: &str, connection_id: u64, role: Role) -> Result<bool> {
        self.request(|ack| RegistryRequest::Leave {
            name: name.to_string(),
            connection_id,
            role,
            ack,
        })
        .await
    }

    pub async fn channel_info(&self, name: &str) -> Result<Option<ChannelInfo>> {
        self.request(|reply| RegistryRequest::Info {
            name: name.to_string(),
            reply,
        })
        .await
    }

    pub async fn channel_count(&self) -> Result<usize> {
        self.request(|reply| RegistryRequest::Count { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Shutdown;
    use tokio::sync::mpsc;

    fn viewer(id: u64) -> ViewerHandle {
        let (sender, _) = mpsc::channel(4);
        ViewerHandle::new(id, sender)
    }

    #[tokio::test]
    async fn test_publish_creates_channel() {
        let registry = ChannelRegistry::spawn();
        let channel = registry
            .register_publisher("cam1", ConnectionHandle::new(1, Shutdown::new()))
            .await
            .unwrap();
        assert_eq!(channel.read().await.name(), "cam1");

        assert_eq!(registry.channel_count().await.unwrap(), 1);
        let info = registry.channel_info("cam1").await.unwrap().unwrap();
        assert_eq!(info.publisher, Some(1));
        assert!(info.viewers.is_empty());
    }

    #[tokio::test]
    async fn test_second_publisher_evicts_first() {
        let registry = ChannelRegistry::spawn();
        let first = Shutdown::new();
        registry
            .register_publisher("cam1", ConnectionHandle::new(1, first.clone()))
            .await
            .unwrap();
        let second = Shutdown::new();
        registry
            .register_publisher("cam1", ConnectionHandle::new(2, second.clone()))
            .await
            .unwrap();

        assert!(first.is_triggered());
        assert!(!second.is_triggered());
        assert_eq!(registry.channel_count().await.unwrap(), 1);

        // The evicted publisher's teardown does not detach its replacement
        assert!(!registry.unregister("cam1", 1, Role::Publisher).await.unwrap());
        let info = registry.channel_info("cam1").await.unwrap().unwrap();
        assert_eq!(info.publisher, Some(2));
    }

    #[tokio::test]
    async fn test_viewer_before_publisher_shares_channel() {
        let registry = ChannelRegistry::spawn();
        let watched = registry.register_viewer("cam1", viewer(7)).await.unwrap();
        let published = registry
            .register_publisher("cam1", ConnectionHandle::new(8, Shutdown::new()))
            .await
            .unwrap();
        assert!(std::sync::Arc::ptr_eq(&watched, &published));
        assert_eq!(published.read().await.viewer_count(), 1);
    }

    #[tokio::test]
    async fn test_channel_removed_when_idle() {
        let registry = ChannelRegistry::spawn();
        registry
            .register_publisher("cam1", ConnectionHandle::new(1, Shutdown::new()))
            .await
            .unwrap();
        registry.register_viewer("cam1", viewer(2)).await.unwrap();

        assert!(registry.unregister("cam1", 2, Role::Viewer).await.unwrap());
        assert_eq!(registry.channel_count().await.unwrap(), 1);
        assert!(!registry.unregister("cam1", 2, Role::Viewer).await.unwrap());

        assert!(registry.unregister("cam1", 1, Role::Publisher).await.unwrap());
        assert_eq!(registry.channel_count().await.unwrap(), 0);
        assert!(registry.channel_info("cam1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_leave_unknown_channel() {
        let registry = ChannelRegistry::spawn();
        assert!(!registry.unregister("nope", 1, Role::Viewer).await.unwrap());
    }
}
