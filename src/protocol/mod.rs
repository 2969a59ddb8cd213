//! Wire protocol: message kinds (§4.2) and their `#`-delimited framing.

pub mod codec;
pub mod message;

pub use message::NetworkMessage;
