mod server;
mod config;
mod context;
mod channel;
mod registry;

pub use server::RtmpServer;
pub use config::{ServerConfig, ServerConfigBuilder, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use context::{ConnectionSlot, ServerContext};
pub use channel::*;
pub use registry::*;
