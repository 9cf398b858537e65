use crate::connection::{SharedSink, Shutdown};
use crate::protocol::RtmpPacket;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A viewer as seen by the broadcast task: identity plus its delivery queue.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    pub connection_id: u64,
    pub sender: mpsc::Sender<RtmpPacket>,
}

impl ViewerHandle {
    pub fn new(connection_id: u64, sender: mpsc::Sender<RtmpPacket>) -> Self {
        ViewerHandle {
            connection_id,
            sender,
        }
    }
}

/// Start the task that writes a viewer's queued packets to its socket, in arrival order
pub fn spawn_delivery(
    connection_id: u64,
    mut packets: mpsc::Receiver<RtmpPacket>,
    sink: SharedSink,
    shutdown: Shutdown,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let packet = tokio::select! {
                _ = shutdown.wait() => break,
                packet = packets.recv() => match packet {
                    Some(packet) => packet,
                    None => break,
                },
            };

            if let Err(e) = sink.lock().await.write_packet(&packet).await {
                warn!("Delivery to viewer {} failed: {}", connection_id, e);
                shutdown.trigger();
                break;
            }
        }
        debug!("Delivery for viewer {} stopped", connection_id);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkReader;
    use crate::connection::PacketSink;
    use crate::protocol::{make_audio_packet, make_video_packet};

    #[tokio::test]
    async fn test_delivery_preserves_order() {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let sink = PacketSink::new(Box::new(server)).shared();
        let (tx, rx) = mpsc::channel(8);
        let shutdown = Shutdown::new();
        let task = spawn_delivery(9, rx, sink, shutdown.clone());

        let audio = make_audio_packet(vec![0xAF, 0x01, 0x10], 0, 1);
        let video = make_video_packet(vec![0x27, 0x01, 0x00, 0x00, 0x00, 0x11], 20, 1);
        tx.send(audio.clone()).await.unwrap();
        tx.send(video.clone()).await.unwrap();

        let mut reader = ChunkReader::new();
        assert_eq!(reader.read_message(&mut client).await.unwrap(), audio);
        assert_eq!(reader.read_message(&mut client).await.unwrap(), video);

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_stops_when_queue_closes() {
        let (_client, server) = tokio::io::duplex(1024);
        let sink = PacketSink::new(Box::new(server)).shared();
        let (tx, rx) = mpsc::channel(8);
        let task = spawn_delivery(1, rx, sink, Shutdown::new());
        drop(tx);
        task.await.unwrap();
    }
}
