use crate::chunk::ChunkWriter;
use crate::protocol::RtmpPacket;
use crate::Result;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Boxed write half of a connection
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Outbound side of a connection: the send-side chunk state and the socket it writes to.
pub struct PacketSink {
    chunk_writer: ChunkWriter,
    io: BoxedWriter,
}

/// Sink shared by the read loop and the viewer delivery task
pub type SharedSink = Arc<Mutex<PacketSink>>;

impl PacketSink {
    pub fn new(io: BoxedWriter) -> Self {
        PacketSink {
            chunk_writer: ChunkWriter::new(),
            io,
        }
    }

    pub fn shared(self) -> SharedSink {
        Arc::new(Mutex::new(self))
    }

    pub async fn write_packet(&mut self, packet: &RtmpPacket) -> Result<()> {
        self.chunk_writer.write_packet(packet, &mut self.io).await
    }

    /// Chunk size for everything written after this call
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_writer.set_chunk_size(size);
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_writer.chunk_size()
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkReader;
    use crate::protocol::make_audio_packet;

    #[tokio::test]
    async fn test_sink_writes_chunks() {
        let (client, server) = tokio::io::duplex(4096);
        let mut sink = PacketSink::new(Box::new(server));
        sink.set_chunk_size(16);
        assert_eq!(sink.chunk_size(), 16);

        let packet = make_audio_packet(vec![0xAF; 40], 100, 1);
        sink.write_packet(&packet).await.unwrap();
        sink.shutdown().await.unwrap();

        let mut reader = ChunkReader::new();
        reader.set_chunk_size(16);
        let mut client = client;
        assert_eq!(reader.read_message(&mut client).await.unwrap(), packet);
    }
}
