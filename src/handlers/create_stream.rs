use crate::amf::Amf0Value;
use crate::connection::Connection;
use crate::handlers::CommandHandler;
use crate::protocol::{RtmpCommand, RtmpHeader};
use crate::{Error, Result};
use log::debug;

pub struct CreateStreamHandler;

impl Default for CreateStreamHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateStreamHandler {
    pub fn new() -> Self {
        CreateStreamHandler
    }
}

#[async_trait::async_trait]
impl CommandHandler for CreateStreamHandler {
    fn command_name(&self) -> &str {
        "createStream"
    }

    async fn handle(&self, command: &RtmpCommand, header: RtmpHeader, conn: &mut Connection) -> Result<()> {
        if !conn.session().state.is_connected() {
            return Err(Error::invalid_state("createStream before connect"));
        }

        let stream_id = conn.session_mut().stream_ids.allocate()?;
        debug!("Connection {} created stream {}", conn.id(), stream_id);

        let response = RtmpCommand::result(
            command.transaction_id,
            Amf0Value::Null,
            Amf0Value::Number(stream_id as f64),
        );
        conn.reply(&header, &response).await
    }
}
