mod connect;
mod create_stream;
mod publish;
mod play;
mod delete_stream;

pub use connect::ConnectHandler;
pub use create_stream::CreateStreamHandler;
pub use delete_stream::DeleteStreamHandler;
pub use play::PlayHandler;
pub use publish::PublishHandler;

use crate::amf::Amf0Value;
use crate::connection::Connection;
use crate::protocol::{RtmpCommand, RtmpHeader};
use crate::{Error, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Commands accepted and ignored, kept for client compatibility
pub const PASSIVE_COMMANDS: &[&str] = &[
    "call",
    "play2",
    "closeStream",
    "receiveAudio",
    "receiveVideo",
    "seek",
    "pause",
    "releaseStream",
    "getStreamLength",
    "FCPublish",
    "FCUnpublish",
];

#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Get command name this handler processes
    fn command_name(&self) -> &str;

    /// Handle the command received with `header` on `conn`
    async fn handle(&self, command: &RtmpCommand, header: RtmpHeader, conn: &mut Connection) -> Result<()>;
}

/// Command handler registry
pub struct CommandHandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl Default for CommandHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandlerRegistry {
    pub fn new() -> Self {
        let mut registry = CommandHandlerRegistry::empty();

        // Register default handlers
        registry.register(Arc::new(ConnectHandler::new()));
        registry.register(Arc::new(CreateStreamHandler::new()));
        registry.register(Arc::new(PublishHandler::new()));
        registry.register(Arc::new(PlayHandler::new()));
        registry.register(Arc::new(DeleteStreamHandler::new()));
        for name in PASSIVE_COMMANDS {
            registry.register(Arc::new(PassiveHandler::new(name)));
        }

        registry
    }

    /// Registry without any handler
    pub fn empty() -> Self {
        CommandHandlerRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Later registrations replace earlier ones with the same name
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.command_name().to_string(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub async fn dispatch(&self, command: &RtmpCommand, header: RtmpHeader, conn: &mut Connection) -> Result<()> {
        match self.handlers.get(&command.name) {
            Some(handler) => handler.handle(command, header, conn).await,
            None => Err(Error::unsupported_command(command.name.as_str())),
        }
    }
}

/// Accepts a command without replying
pub struct PassiveHandler {
    name: &'static str,
}

impl PassiveHandler {
    pub fn new(name: &'static str) -> Self {
        PassiveHandler { name }
    }
}

#[async_trait::async_trait]
impl CommandHandler for PassiveHandler {
    fn command_name(&self) -> &str {
        self.name
    }

    async fn handle(&self, command: &RtmpCommand, _header: RtmpHeader, conn: &mut Connection) -> Result<()> {
        debug!("Connection {} ignoring {} (transaction {})", conn.id(), command.name, command.transaction_id);
        Ok(())
    }
}

/// Info object of a status reply
pub(crate) fn status_info(level: &str, code: &str, description: &str) -> Amf0Value {
    Amf0Value::object([
        ("level", Amf0Value::from(level)),
        ("code", Amf0Value::from(code)),
        ("description", Amf0Value::from(description)),
        ("objectEncoding", Amf0Value::from(0.0)),
    ])
}

/// `onStatus` with level "status"
pub(crate) fn on_status(code: &str, description: &str) -> RtmpCommand {
    RtmpCommand::new("onStatus", 0.0).arg(status_info("status", code, description))
}
