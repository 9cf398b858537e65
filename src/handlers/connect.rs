use crate::amf::{Amf0Value, ObjectEncoding};
use crate::connection::{ConnectInfo, Connection, ConnectionState};
use crate::handlers::{status_info, CommandHandler};
use crate::protocol::constants::*;
use crate::protocol::{ControlMessage, RtmpCommand, RtmpHeader};
use crate::{Error, Result};
use log::{info, warn};

const FMS_VERSION: &str = "FMS/3,0,1,123";
const CAPABILITIES: f64 = 31.0;

pub struct ConnectHandler;

impl Default for ConnectHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectHandler {
    pub fn new() -> Self {
        ConnectHandler
    }

    fn create_connect_result(&self, transaction_id: f64) -> RtmpCommand {
        let props = Amf0Value::object([
            ("fmsVer", Amf0Value::from(FMS_VERSION)),
            ("capabilities", Amf0Value::from(CAPABILITIES)),
        ]);
        let info = status_info(
            "status",
            "NetConnection.Connect.Success",
            "The connection attempt succeeded.",
        );
        RtmpCommand::result(transaction_id, props, info)
    }

    /// Window ack size, peer bandwidth and our chunk size, in that order
    async fn send_server_bandwidth(&self, conn: &Connection) -> Result<()> {
        let config = conn.config();
        let window_ack_size = config.window_ack_size;
        let peer_bandwidth = config.peer_bandwidth;
        let chunk_size = config.chunk_size;

        conn.send(&ControlMessage::WindowAckSize(window_ack_size).to_packet()?).await?;
        conn.send(
            &ControlMessage::SetPeerBandwidth {
                size: peer_bandwidth,
                limit_type: PEER_BW_LIMIT_DYNAMIC,
            }
            .to_packet()?,
        )
        .await?;
        conn.send(&ControlMessage::SetChunkSize(chunk_size).to_packet()?).await?;
        conn.set_send_chunk_size(chunk_size as usize).await;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CommandHandler for ConnectHandler {
    fn command_name(&self) -> &str {
        "connect"
    }

    async fn handle(&self, command: &RtmpCommand, header: RtmpHeader, conn: &mut Connection) -> Result<()> {
        if command.transaction_id != 1.0 {
            return Err(Error::protocol(format!(
                "connect must use transaction id 1, got {}",
                command.transaction_id
            )));
        }
        if conn.session().state != ConnectionState::Handshaking {
            return Err(Error::invalid_state("connect received twice"));
        }

        let params = ConnectInfo::from_command_object(&command.command_object)?;
        if params.object_encoding == ObjectEncoding::Amf3 {
            warn!(
                "Connection {} asked for AMF3 object encoding, continuing with AMF0",
                conn.id()
            );
        }
        info!(
            "Connection {} connect app={} tcUrl={}",
            conn.id(),
            params.app.as_deref().unwrap_or(""),
            params.tc_url.as_deref().unwrap_or("")
        );

        let session = conn.session_mut();
        session.object_encoding = ObjectEncoding::Amf0;
        session.connect = Some(params);

        self.send_server_bandwidth(conn).await?;
        conn.reply(&header, &self.create_connect_result(command.transaction_id)).await?;
        conn.session_mut().transition(ConnectionState::Connected)
    }
}
