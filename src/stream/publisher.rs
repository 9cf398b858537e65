use crate::connection::Shutdown;
use crate::processing::PayloadTransform;
use crate::protocol::RtmpPacket;
use crate::server::SharedChannel;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;

/// What happened to a packet handed to `MediaQueue::push`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The queue was full with nobody watching; the oldest packet made room
    DroppedOldest,
    /// The publisher's quit signal fired; the packet was discarded
    Closed,
}

/// Bounded per-publisher queue between the read loop and the broadcast task.
pub struct MediaQueue {
    packets: Mutex<VecDeque<RtmpPacket>>,
    capacity: usize,
    viewers: watch::Receiver<usize>,
    readable: Notify,
    writable: Notify,
    shutdown: Shutdown,
}

impl MediaQueue {
    /// `viewers` follows the viewer count of the publisher's channel; `shutdown` is the
    /// publisher connection's quit signal
    pub fn new(capacity: usize, viewers: watch::Receiver<usize>, shutdown: Shutdown) -> Self {
        MediaQueue {
            packets: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity: capacity.max(1),
            viewers,
            readable: Notify::new(),
            writable: Notify::new(),
            shutdown,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.packets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.packets.lock().await.is_empty()
    }

    /// Queue a packet. When full, drops the oldest packet if there are no viewers
    /// and otherwise waits for the broadcast task to make room or the quit signal.
    pub async fn push(&self, packet: RtmpPacket) -> PushOutcome {
        let mut viewers = self.viewers.clone();
        loop {
            if self.shutdown.is_triggered() {
                return PushOutcome::Closed;
            }
            let watching = *viewers.borrow_and_update() > 0;
            {
                let mut packets = self.packets.lock().await;
                if packets.len() < self.capacity {
                    packets.push_back(packet);
                    self.readable.notify_one();
                    return PushOutcome::Queued;
                }
                if !watching {
                    packets.pop_front();
                    packets.push_back(packet);
                    return PushOutcome::DroppedOldest;
                }
            }
            tokio::select! {
                _ = self.shutdown.wait() => return PushOutcome::Closed,
                _ = self.writable.notified() => {}
                changed = viewers.changed() => {
                    if changed.is_err() {
                        // Channel gone; nobody can be watching any more
                        let mut packets = self.packets.lock().await;
                        packets.pop_front();
                        packets.push_back(packet);
                        return PushOutcome::DroppedOldest;
                    }
                }
            }
        }
    }

    /// Take the oldest packet, waiting while the queue is empty
    pub async fn pop(&self) -> RtmpPacket {
        loop {
            if let Some(packet) = self.packets.lock().await.pop_front() {
                self.writable.notify_one();
                return packet;
            }
            self.readable.notified().await;
        }
    }
}

/// Start the task that fans a publisher's queue out to the channel's viewers
pub fn spawn_broadcast(
    name: String,
    queue: Arc<MediaQueue>,
    channel: SharedChannel,
    transform: Arc<dyn PayloadTransform>,
    shutdown: Shutdown,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut viewers = queue.viewers.clone();
        loop {
            // Packets stay queued while nobody is watching
            tokio::select! {
                _ = shutdown.wait() => break,
                ready = async { viewers.wait_for(|count| *count > 0).await.is_ok() } => {
                    if !ready {
                        break;
                    }
                }
            }

            let packet = tokio::select! {
                _ = shutdown.wait() => break,
                packet = queue.pop() => packet,
            };

            let packet = match transform.transform(&packet) {
                Ok(packet) => packet,
                Err(e) => {
                    warn!("Dropping media packet on {}: {}", name, e);
                    continue;
                }
            };

            let targets = channel.read().await.viewer_snapshot();
            for viewer in targets {
                match viewer.sender.try_send(packet.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("Viewer {} of {} is falling behind, dropping packet", viewer.connection_id, name);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Viewer {} of {} already gone", viewer.connection_id, name);
                    }
                }
            }
        }
        debug!("Broadcast for {} stopped", name);
    })
}
