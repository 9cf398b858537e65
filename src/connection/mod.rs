mod connection;
mod session;
mod shutdown;
mod sink;
mod state;
mod stream_ids;

pub use connection::*;
pub use session::*;
pub use shutdown::*;
pub use sink::*;
pub use state::*;
pub use stream_ids::*;
