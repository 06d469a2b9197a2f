//! Wire protocol constants

/// Size of the big-endian length prefix in front of every message
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest payload a length prefix can describe
pub const MAX_MESSAGE_SIZE: usize = u32::MAX as usize;

/// Destination channels starting with these bytes use round-robin delivery
pub const QUEUE_PREFIX: &[u8] = b"/queue";

/// Default listener address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:25000";

/// Upper bound on a single buffer reservation while reading a payload
pub const READ_CHUNK_SIZE: usize = 64 * 1024;
