// Common test utilities for the integration tests

#![allow(dead_code)]

use rtmp::{
    client_handshake, make_audio_packet, make_video_packet, ChunkReader, ChunkWriter, ControlMessage, Result,
    RtmpCommand, RtmpPacket, RtmpServer, ServerConfig, ServerContext, MSG_TYPE_AUDIO, MSG_TYPE_COMMAND_AMF0,
    MSG_TYPE_VIDEO,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback config on an ephemeral port
pub fn test_config() -> ServerConfig {
    ServerConfig::builder()
        .host("127.0.0.1")
        .port(0)
        .build()
        .expect("valid test config")
}

/// Running server bound to an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    pub context: Arc<ServerContext>,
    pub task: JoinHandle<Result<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub async fn start_server(config: ServerConfig) -> TestServer {
    let server = RtmpServer::new(config);
    let listener = server.bind().await.expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    let context = server.context();
    let task = tokio::spawn(async move { server.serve(listener).await });
    TestServer { addr, context, task }
}

/// Minimal RTMP client speaking through the crate's own chunk codec
pub struct TestClient {
    stream: TcpStream,
    reader: ChunkReader,
    writer: ChunkWriter,
}

impl TestClient {
    /// TCP connect and handshake
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let mut stream = TcpStream::connect(addr).await?;
        client_handshake(&mut stream).await?;
        Ok(TestClient {
            stream,
            reader: ChunkReader::new(),
            writer: ChunkWriter::new(),
        })
    }

    pub async fn send(&mut self, packet: &RtmpPacket) -> Result<()> {
        self.writer.write_packet(packet, &mut self.stream).await
    }

    pub async fn send_command(&mut self, command: &RtmpCommand, chunk_stream_id: u32, stream_id: u32) -> Result<()> {
        let packet = command.to_packet(chunk_stream_id, stream_id)?;
        self.send(&packet).await
    }

    /// Next message, following any chunk size change the server announces
    pub async fn read_packet(&mut self) -> Result<RtmpPacket> {
        let packet = tokio::time::timeout(READ_TIMEOUT, self.reader.read_message(&mut self.stream))
            .await
            .expect("timed out waiting for the server")?;
        if let Ok(ControlMessage::SetChunkSize(size)) = ControlMessage::decode(packet.message_type(), &packet.payload)
        {
            self.reader.set_chunk_size(size as usize);
        }
        Ok(packet)
    }

    /// Skip messages until the named command arrives
    pub async fn read_command(&mut self, name: &str) -> RtmpCommand {
        loop {
            let packet = self.read_packet().await.expect("connection closed");
            if packet.message_type() != MSG_TYPE_COMMAND_AMF0 {
                continue;
            }
            let command = RtmpCommand::decode(&packet.payload).expect("valid command");
            if command.name == name {
                return command;
            }
        }
    }

    /// Skip messages until an audio or video message arrives
    pub async fn read_media(&mut self) -> RtmpPacket {
        loop {
            let packet = self.read_packet().await.expect("connection closed");
            if matches!(packet.message_type(), MSG_TYPE_AUDIO | MSG_TYPE_VIDEO) {
                return packet;
            }
        }
    }

    /// `connect`, returning every message up to and including the `_result`
    pub async fn rtmp_connect(&mut self, app: &str) -> Vec<RtmpPacket> {
        let tc_url = format!("rtmp://127.0.0.1/{}", app);
        self.send_command(&RtmpCommand::connect(app, &tc_url), 3, 0)
            .await
            .expect("send connect");

        let mut packets = Vec::new();
        loop {
            let packet = self.read_packet().await.expect("connection closed");
            let done = packet.message_type() == MSG_TYPE_COMMAND_AMF0
                && RtmpCommand::decode(&packet.payload).is_ok_and(|c| c.name == "_result");
            packets.push(packet);
            if done {
                return packets;
            }
        }
    }

    pub async fn create_stream(&mut self, transaction_id: f64) -> u32 {
        self.send_command(&RtmpCommand::create_stream(transaction_id), 3, 0)
            .await
            .expect("send createStream");
        let result = self.read_command("_result").await;
        assert_eq!(result.transaction_id, transaction_id);
        result.arguments[0].as_number().expect("stream id") as u32
    }

    /// connect, createStream and publish; returns the onStatus code
    pub async fn start_publish(&mut self, name: &str) -> String {
        self.rtmp_connect("live").await;
        let stream_id = self.create_stream(2.0).await;
        self.send_command(&RtmpCommand::publish(3.0, name, "live"), 8, stream_id)
            .await
            .expect("send publish");
        status_code(&self.read_command("onStatus").await)
    }

    /// connect, createStream and play; returns every message up to the second onStatus
    pub async fn start_play(&mut self, name: &str) -> Vec<RtmpPacket> {
        self.rtmp_connect("live").await;
        let stream_id = self.create_stream(2.0).await;
        self.send_command(&RtmpCommand::play(3.0, name), 8, stream_id)
            .await
            .expect("send play");

        let mut packets = Vec::new();
        let mut statuses = 0;
        while statuses < 2 {
            let packet = self.read_packet().await.expect("connection closed");
            if packet.message_type() == MSG_TYPE_COMMAND_AMF0 {
                statuses += 1;
            }
            packets.push(packet);
        }
        packets
    }
}

pub fn status_code(command: &RtmpCommand) -> String {
    command.arguments[0]
        .get_property("code")
        .and_then(|v| v.as_string())
        .unwrap_or_default()
        .to_string()
}

/// AAC sequence header, then alternating H.264 and AAC frames
pub fn sample_media(stream_id: u32) -> Vec<RtmpPacket> {
    vec![
        make_audio_packet(vec![0xAF, 0x00, 0x12, 0x10], 0, stream_id),
        make_video_packet(vec![0x17, 0x00, 0x00, 0x00, 0x00, 0x01, 0x64, 0x00, 0x1F], 0, stream_id),
        make_video_packet(vec![0x17, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x65], 0, stream_id),
        make_audio_packet(vec![0xAF, 0x01, 0x21, 0x10, 0x04], 23, stream_id),
        make_video_packet(vec![0x27, 0x01, 0x00, 0x00, 0x21, 0x00, 0x00, 0x00, 0x02, 0x41, 0x9A], 33, stream_id),
        make_audio_packet(vec![0xAF, 0x01, 0x21, 0x10, 0x05], 46, stream_id),
    ]
}
