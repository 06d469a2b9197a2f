//! Wire protocol
//!
//! A connection carries a sequence of length-prefixed messages. The first
//! message names the channel the client subscribes to; after that messages
//! come in pairs of destination channel and payload. The broker never replies
//! on the sender's own connection.

pub mod codec;
pub mod constants;

pub use codec::{encode_length_prefix, read_message, write_message};
