mod publisher;
mod player;

pub use publisher::*;
pub use player::*;
