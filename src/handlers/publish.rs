use crate::connection::{Connection, ConnectionState, StreamBinding};
use crate::handlers::{on_status, CommandHandler};
use crate::protocol::{RtmpCommand, RtmpHeader};
use crate::server::{ConnectionHandle, Role};
use crate::stream::{spawn_broadcast, MediaQueue};
use crate::{Error, Result};
use log::info;
use std::sync::Arc;

const DEFAULT_PUBLISH_TYPE: &str = "live";

pub struct PublishHandler;

impl Default for PublishHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishHandler {
    pub fn new() -> Self {
        PublishHandler
    }
}

#[async_trait::async_trait]
impl CommandHandler for PublishHandler {
    fn command_name(&self) -> &str {
        "publish"
    }

    async fn handle(&self, command: &RtmpCommand, header: RtmpHeader, conn: &mut Connection) -> Result<()> {
        let stream_name = command.string_arg(0, "stream name")?.to_string();
        let publish_type = command
            .optional_string_arg(1, "publish type")?
            .unwrap_or(DEFAULT_PUBLISH_TYPE)
            .to_string();

        if !conn.session().state.can_bind_role() {
            return Err(Error::invalid_state(format!(
                "publish in state {:?}",
                conn.session().state
            )));
        }

        let shutdown = conn.shutdown_signal();
        let channel = conn
            .registry()
            .register_publisher(&stream_name, ConnectionHandle::new(conn.id(), shutdown.clone()))
            .await?;
        let viewers = channel.read().await.subscribe_viewers();

        let queue = Arc::new(MediaQueue::new(
            conn.config().media_queue_capacity,
            viewers,
            shutdown.clone(),
        ));
        let task = spawn_broadcast(
            stream_name.clone(),
            queue.clone(),
            channel,
            conn.context().transform().clone(),
            shutdown,
        );
        conn.attach_task(task);
        conn.set_media_queue(queue);

        info!("Connection {} publishing {} ({})", conn.id(), stream_name, publish_type);
        let session = conn.session_mut();
        session.binding = Some(StreamBinding {
            name: stream_name,
            role: Role::Publisher,
            publish_type: Some(publish_type),
            stream_id: header.message_stream_id,
        });
        session.transition(ConnectionState::Publishing)?;

        conn.reply(&header, &on_status("NetStream.Publish.Start", "Publish was successful."))
            .await
    }
}
