//! Channel names used as registry keys

use std::fmt;

use bytes::Bytes;

use crate::protocol::constants::QUEUE_PREFIX;

/// Name of a channel
///
/// Opaque bytes compared exactly; cheap to clone since the bytes are
/// reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(Bytes);

impl ChannelName {
    /// Create a channel name from raw bytes
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self(name.into())
    }

    /// Raw bytes of the name
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether deliveries to this channel go to a single subscriber in turn
    pub fn is_queue(&self) -> bool {
        self.0.starts_with(QUEUE_PREFIX)
    }
}

impl From<Bytes> for ChannelName {
    fn from(name: Bytes) -> Self {
        Self(name)
    }
}

impl From<Vec<u8>> for ChannelName {
    fn from(name: Vec<u8>) -> Self {
        Self(Bytes::from(name))
    }
}

impl From<String> for ChannelName {
    fn from(name: String) -> Self {
        Self(Bytes::from(name))
    }
}

impl From<&'static str> for ChannelName {
    fn from(name: &'static str) -> Self {
        Self(Bytes::from_static(name.as_bytes()))
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_prefix_detection() {
        assert!(ChannelName::from("/queue").is_queue());
        assert!(ChannelName::from("/queue/jobs").is_queue());
        assert!(ChannelName::from("/queuejobs").is_queue());
        assert!(!ChannelName::from("chatroom").is_queue());
        assert!(!ChannelName::from("/QUEUE/jobs").is_queue());
        assert!(!ChannelName::from("jobs/queue").is_queue());
    }

    #[test]
    fn test_names_are_byte_exact() {
        assert_ne!(ChannelName::from("Chat"), ChannelName::from("chat"));
        assert_eq!(
            ChannelName::new(Bytes::from(vec![b'a', 0xff])),
            ChannelName::new(Bytes::from(vec![b'a', 0xff]))
        );
    }

    #[test]
    fn test_display_is_lossy() {
        let name = ChannelName::new(Bytes::from(vec![b'a', 0xff]));
        assert_eq!(name.to_string(), "a\u{fffd}");
    }
}
