use crate::connection::{Connection, ConnectionState, StreamBinding};
use crate::handlers::{on_status, CommandHandler};
use crate::protocol::{RtmpCommand, RtmpHeader, UserControlEvent};
use crate::server::Role;
use crate::stream::{spawn_delivery, ViewerHandle};
use crate::{Error, Result};
use log::info;
use tokio::sync::mpsc;

pub struct PlayHandler;

impl Default for PlayHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayHandler {
    pub fn new() -> Self {
        PlayHandler
    }
}

#[async_trait::async_trait]
impl CommandHandler for PlayHandler {
    fn command_name(&self) -> &str {
        "play"
    }

    async fn handle(&self, command: &RtmpCommand, header: RtmpHeader, conn: &mut Connection) -> Result<()> {
        let stream_name = command.string_arg(0, "stream name")?.to_string();

        if !conn.session().state.can_bind_role() {
            return Err(Error::invalid_state(format!(
                "play in state {:?}",
                conn.session().state
            )));
        }

        let (sender, receiver) = mpsc::channel(conn.config().viewer_queue_capacity);
        conn.registry()
            .register_viewer(&stream_name, ViewerHandle::new(conn.id(), sender))
            .await?;

        // The registry now holds our binding; record it before anything can fail
        let session = conn.session_mut();
        session.binding = Some(StreamBinding {
            name: stream_name.clone(),
            role: Role::Viewer,
            publish_type: None,
            stream_id: header.message_stream_id,
        });
        session.transition(ConnectionState::Playing)?;

        // Replies go out before the first media packet can
        conn.send(&UserControlEvent::StreamBegin(header.message_stream_id).to_packet()?)
            .await?;
        conn.reply(&header, &on_status("NetStream.Play.Reset", "Caused by a play list reset."))
            .await?;
        conn.reply(&header, &on_status("NetStream.Play.Start", "Playback has started."))
            .await?;

        let task = spawn_delivery(conn.id(), receiver, conn.sink(), conn.shutdown_signal());
        conn.attach_task(task);

        info!("Connection {} playing {}", conn.id(), stream_name);
        Ok(())
    }
}
