use crate::chunk::ChunkReader;
use crate::connection::{
    BoxedWriter, BufferLength, ConnectionState, PacketSink, PeerBandwidth, Session, SharedSink, Shutdown,
};
use crate::handshake::server_handshake;
use crate::message::{classify_message, MessageType};
use crate::processing::FlvTagTransform;
use crate::protocol::{ControlMessage, RtmpCommand, RtmpData, RtmpHeader, RtmpPacket, UserControlEvent};
use crate::server::{RegistryHandle, ServerConfig, ServerContext};
use crate::stream::{MediaQueue, PushOutcome};
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

/// Dropped media is reported once per this many packets
const DROP_REPORT_INTERVAL: u64 = 1024;

/// One client connection: the receive-side chunk state, the session and the outbound sink.
pub struct Connection {
    id: u64,
    peer: String,
    context: Arc<ServerContext>,
    session: Session,
    reader: ChunkReader,
    sink: SharedSink,
    shutdown: Shutdown,
    /// Broadcast or delivery tasks started by `publish`/`play`
    tasks: Vec<JoinHandle<()>>,
    media_queue: Option<Arc<MediaQueue>>,
    dropped_media: u64,
}

impl Connection {
    pub fn new(id: u64, peer: impl Into<String>, context: Arc<ServerContext>, writer: BoxedWriter) -> Self {
        Connection {
            id,
            peer: peer.into(),
            context,
            session: Session::new(),
            reader: ChunkReader::new(),
            sink: PacketSink::new(writer).shared(),
            shutdown: Shutdown::new(),
            tasks: Vec::new(),
            media_queue: None,
            dropped_media: 0,
        }
    }

    /// Handshake, then run the read loop until the peer leaves or a fatal error occurs
    pub async fn serve<S>(id: u64, peer: impl Into<String>, context: Arc<ServerContext>, mut stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let peer = peer.into();
        server_handshake(&mut stream).await?;
        debug!("Connection {} ({}) completed handshake", id, peer);

        let (mut input, output) = tokio::io::split(stream);
        let mut connection = Connection::new(id, peer, context, Box::new(output));
        let result = connection.run(&mut input).await;
        connection.teardown().await;

        match result {
            Err(Error::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                info!("Connection {} ({}) closed by peer", connection.id, connection.peer);
                Ok(())
            }
            Err(e) => {
                error!("Connection {} ({}) failed: {}", connection.id, connection.peer, e);
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn config(&self) -> &ServerConfig {
        self.context.config()
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    pub fn registry(&self) -> &RegistryHandle {
        self.context.registry()
    }

    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn sink(&self) -> SharedSink {
        self.sink.clone()
    }

    pub async fn send(&self, packet: &RtmpPacket) -> Result<()> {
        self.sink.lock().await.write_packet(packet).await
    }

    /// Send `command` on the chunk and message stream of `request`
    pub async fn reply(&self, request: &RtmpHeader, command: &RtmpCommand) -> Result<()> {
        let packet = command.to_packet(request.chunk_stream_id, request.message_stream_id)?;
        self.send(&packet).await
    }

    /// Chunk size for everything this connection writes from now on
    pub async fn set_send_chunk_size(&self, size: usize) {
        self.sink.lock().await.set_chunk_size(size);
    }

    pub fn attach_task(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    pub fn set_media_queue(&mut self, queue: Arc<MediaQueue>) {
        self.media_queue = Some(queue);
    }

    /// Read and dispatch messages until the session closes or the quit signal fires
    pub async fn run<R: AsyncRead + Unpin>(&mut self, input: &mut R) -> Result<()> {
        loop {
            if self.session.state == ConnectionState::Closed {
                info!("Connection {} ({}) closed its last stream", self.id, self.peer);
                return Ok(());
            }

            let next = tokio::select! {
                _ = self.shutdown.wait() => None,
                packet = self.reader.read_message(input) => Some(packet),
            };
            let Some(packet) = next else {
                info!("Connection {} ({}) asked to close", self.id, self.peer);
                return Ok(());
            };

            if let Err(e) = self.handle_packet(packet?).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("Connection {} ({}): {}", self.id, self.peer, e);
            }
        }
    }

    async fn handle_packet(&mut self, packet: RtmpPacket) -> Result<()> {
        match classify_message(&packet) {
            MessageType::Control(_) => self.handle_control(&packet),
            MessageType::UserControl => self.handle_user_control(&packet),
            MessageType::Command => self.handle_command(packet).await,
            MessageType::Audio | MessageType::Video => self.handle_media(packet).await,
            MessageType::Data => self.handle_data(&packet),
            MessageType::SharedObject | MessageType::Aggregate => {
                debug!(
                    "Connection {} ignoring message type {} ({} bytes)",
                    self.id,
                    packet.message_type(),
                    packet.payload.len()
                );
                Ok(())
            }
            MessageType::Unknown(id) => {
                warn!("Connection {} received unknown message type {}", self.id, id);
                Ok(())
            }
        }
    }

    fn handle_control(&mut self, packet: &RtmpPacket) -> Result<()> {
        match ControlMessage::decode(packet.message_type(), &packet.payload)? {
            ControlMessage::SetChunkSize(size) => {
                debug!("Connection {} peer chunk size {}", self.id, size);
                self.reader.set_chunk_size(size as usize);
            }
            ControlMessage::Abort(cs_id) => {
                if !self.reader.abort(cs_id) {
                    debug!("Connection {} abort on idle chunk stream {}", self.id, cs_id);
                }
            }
            ControlMessage::Acknowledgement(sequence) => {
                debug!("Connection {} peer acknowledged {} bytes", self.id, sequence);
            }
            ControlMessage::WindowAckSize(size) => {
                self.session.peer_window_ack_size = Some(size);
            }
            ControlMessage::SetPeerBandwidth { size, limit_type } => {
                self.session.peer_bandwidth = Some(PeerBandwidth { size, limit_type });
            }
        }
        Ok(())
    }

    fn handle_user_control(&mut self, packet: &RtmpPacket) -> Result<()> {
        match UserControlEvent::decode(&packet.payload)? {
            UserControlEvent::SetBufferLength { stream_id, buffer_ms } => {
                debug!("Connection {} buffer length {}ms on stream {}", self.id, buffer_ms, stream_id);
                self.session.buffer_length = Some(BufferLength { stream_id, buffer_ms });
                Ok(())
            }
            UserControlEvent::PingResponse(timestamp) => {
                self.session.last_ping_response = Some(timestamp);
                Ok(())
            }
            other => Err(Error::UnsupportedEvent(other.event_type())),
        }
    }

    async fn handle_command(&mut self, packet: RtmpPacket) -> Result<()> {
        let command = RtmpCommand::decode_message(packet.message_type(), &packet.payload)?;
        debug!(
            "Connection {} command {} (transaction {})",
            self.id, command.name, command.transaction_id
        );
        let handlers = self.context.handlers().clone();
        handlers.dispatch(&command, packet.header, self).await
    }

    async fn handle_media(&mut self, packet: RtmpPacket) -> Result<()> {
        let Some(queue) = self.media_queue.clone() else {
            warn!(
                "Connection {} sent media type {} without publishing",
                self.id,
                packet.message_type()
            );
            return Ok(());
        };

        if let Ok(tag) = FlvTagTransform.decode(&packet) {
            if tag.is_sequence_header() {
                info!("Connection {} publishes {} sequence header", self.id, tag.codec_name());
            }
        }

        match queue.push(packet).await {
            PushOutcome::Queued => {}
            PushOutcome::DroppedOldest => {
                self.dropped_media += 1;
                if self.dropped_media % DROP_REPORT_INTERVAL == 1 {
                    warn!(
                        "Connection {} media queue full with no viewers, {} packets dropped so far",
                        self.id, self.dropped_media
                    );
                }
            }
            PushOutcome::Closed => debug!("Connection {} closing, media packet discarded", self.id),
        }
        Ok(())
    }

    fn handle_data(&self, packet: &RtmpPacket) -> Result<()> {
        let data = RtmpData::decode_message(packet.message_type(), &packet.payload)?;
        match data.metadata() {
            Some(metadata) => debug!("Connection {} metadata with {} fields", self.id, metadata.len()),
            None => debug!("Connection {} data message {}", self.id, data.data_type),
        }
        Ok(())
    }

    /// Signal quit, detach from the registry and close the write side
    pub async fn teardown(&mut self) {
        self.shutdown.trigger();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.media_queue = None;

        if let Some(binding) = self.session.binding.take() {
            match self.registry().unregister(&binding.name, self.id, binding.role).await {
                Ok(_) => debug!("Connection {} detached from {}", self.id, binding.name),
                Err(e) => warn!("Connection {} could not detach from {}: {}", self.id, binding.name, e),
            }
        }
        self.session.state = ConnectionState::Closed;

        if let Err(e) = self.sink.lock().await.shutdown().await {
            debug!("Connection {} writer shutdown: {}", self.id, e);
        }
    }
}
