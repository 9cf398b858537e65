use crate::connection::{Connection, ConnectionState};
use crate::handlers::CommandHandler;
use crate::protocol::{RtmpCommand, RtmpHeader};
use crate::Result;
use log::{debug, warn};

pub struct DeleteStreamHandler;

impl Default for DeleteStreamHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DeleteStreamHandler {
    pub fn new() -> Self {
        DeleteStreamHandler
    }
}

#[async_trait::async_trait]
impl CommandHandler for DeleteStreamHandler {
    fn command_name(&self) -> &str {
        "deleteStream"
    }

    async fn handle(&self, command: &RtmpCommand, _header: RtmpHeader, conn: &mut Connection) -> Result<()> {
        let stream_id = command.number_arg(0, "stream id")?;
        let id = conn.id();
        let session = conn.session_mut();

        if stream_id < 0.0 || stream_id.fract() != 0.0 || !session.stream_ids.remove(stream_id as u32) {
            warn!("Connection {} deleteStream for unknown stream {}", id, stream_id);
            return Ok(());
        }
        debug!("Connection {} deleted stream {}", id, stream_id);

        if session.stream_ids.only_control_remains() {
            session.transition(ConnectionState::Closed)?;
        }
        Ok(())
    }
}
