//! Subscriber handles
//!
//! A session owns its write half as a [`SharedWriter`]. The registry only
//! keeps a [`SubscriberHandle`], which holds a `Weak` reference: once the
//! session drops its writer the connection closes, even if the handle is
//! still sitting in a channel.

use std::fmt;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

use crate::error::{DispatchError, Error, Result};
use crate::protocol::codec;

/// Type-erased write half of a connection
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Writer shared between a session and everyone dispatching to it
///
/// The mutex serializes writers so each message is contiguous on the wire.
pub type SharedWriter = Arc<Mutex<BoxedWriter>>;

/// Wrap a write half for sharing
pub fn shared_writer<W>(writer: W) -> SharedWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(Mutex::new(Box::new(writer)))
}

/// Non-owning reference to a subscribed session's writer
#[derive(Clone)]
pub struct SubscriberHandle {
    id: u64,
    writer: Weak<Mutex<BoxedWriter>>,
}

impl SubscriberHandle {
    /// Create a handle for the session `id`
    pub fn new(id: u64, writer: &SharedWriter) -> Self {
        Self {
            id,
            writer: Arc::downgrade(writer),
        }
    }

    /// Session ID this handle belongs to
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the owning session still holds its writer
    pub fn is_connected(&self) -> bool {
        self.writer.strong_count() > 0
    }

    /// Write one message to the subscriber
    ///
    /// Suspends until the subscriber's transport accepts the bytes, so a slow
    /// reader slows down the dispatching session instead of losing data.
    pub async fn deliver(&self, payload: &Bytes) -> Result<()> {
        let writer = self
            .writer
            .upgrade()
            .ok_or(Error::Dispatch(DispatchError::SubscriberGone))?;
        let mut writer = writer.lock().await;

        codec::write_message(&mut *writer, payload)
            .await
            .map_err(|e| match e {
                Error::Io(e) => Error::Dispatch(DispatchError::Io(e)),
                other => other,
            })
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriberHandle {}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_deliver_writes_framed_payload() {
        let (client, mut server) = tokio::io::duplex(1024);
        let writer = shared_writer(client);
        let handle = SubscriberHandle::new(1, &writer);

        handle.deliver(&Bytes::from_static(b"hello")).await.unwrap();

        let mut buf = [0u8; 9];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\x00\x00\x00\x05hello");
    }

    #[tokio::test]
    async fn test_deliver_after_owner_dropped() {
        let (client, _server) = tokio::io::duplex(1024);
        let writer = shared_writer(client);
        let handle = SubscriberHandle::new(7, &writer);
        assert!(handle.is_connected());

        drop(writer);

        assert!(!handle.is_connected());
        let result = handle.deliver(&Bytes::from_static(b"x")).await;
        assert!(matches!(
            result,
            Err(Error::Dispatch(DispatchError::SubscriberGone))
        ));
    }

    #[tokio::test]
    async fn test_deliver_to_closed_peer_fails() {
        let (client, server) = tokio::io::duplex(16);
        let writer = shared_writer(client);
        let handle = SubscriberHandle::new(3, &writer);
        drop(server);

        let result = handle.deliver(&Bytes::from_static(b"payload")).await;
        assert!(matches!(result, Err(Error::Dispatch(DispatchError::Io(_)))));
    }

    #[test]
    fn test_equality_by_session_id() {
        let (a, _a) = tokio::io::duplex(8);
        let (b, _b) = tokio::io::duplex(8);
        let wa = shared_writer(a);
        let wb = shared_writer(b);

        assert_eq!(SubscriberHandle::new(1, &wa), SubscriberHandle::new(1, &wb));
        assert_ne!(SubscriberHandle::new(1, &wa), SubscriberHandle::new(2, &wa));
    }
}
