//! Per-connection session
//!
//! A session reads its subscribe message, registers on that channel, then
//! routes destination/payload pairs until the client goes away or the server
//! cancels it. Teardown runs once on every exit path.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tokio::io::{AsyncRead, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::protocol::codec;
use crate::registry::{
    shared_writer, ChannelName, SharedWriter, SubscriberHandle, SubscriberRegistry, Subscription,
};
use crate::session::{DisconnectReason, SessionState};
use crate::stats::SessionStats;

/// Number of payload bytes shown in routing logs
const PREVIEW_LEN: usize = 19;

/// Outcome of one fan-out round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub failed: usize,
}

/// Deliver `payload` to every recipient concurrently
///
/// Waits for all writes to finish. A failing recipient is logged and counted
/// but does not affect the others.
pub async fn dispatch(recipients: &[SubscriberHandle], payload: &Bytes) -> FanOut {
    let results = join_all(recipients.iter().map(|handle| handle.deliver(payload))).await;

    let mut fan_out = FanOut::default();
    for (handle, result) in recipients.iter().zip(results) {
        match result {
            Ok(()) => fan_out.delivered += 1,
            Err(e) => {
                fan_out.failed += 1;
                tracing::debug!(subscriber = handle.id(), error = %e, "Delivery failed");
            }
        }
    }
    fan_out
}

/// A client session bound to one connection
pub struct Connection<R> {
    state: SessionState,
    reader: R,
    writer: SharedWriter,
    registry: Arc<SubscriberRegistry>,
    stats: SessionStats,
}

impl Connection<BufReader<OwnedReadHalf>> {
    /// Create a session for an accepted TCP connection
    pub fn from_tcp(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        let (reader, writer) = socket.into_split();
        Self::new(
            session_id,
            peer_addr,
            BufReader::new(reader),
            shared_writer(writer),
            registry,
        )
    }
}

impl<R> Connection<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Create a session over an arbitrary read half and shared writer
    pub fn new(
        session_id: u64,
        peer_addr: SocketAddr,
        reader: R,
        writer: SharedWriter,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            state: SessionState::new(session_id, peer_addr),
            reader,
            writer,
            registry,
            stats: SessionStats::new(),
        }
    }

    /// Run the session to completion
    ///
    /// Cancelling `shutdown` stops the session at its next read or write; it
    /// then goes through the same teardown as a client disconnect.
    pub async fn run(mut self, shutdown: CancellationToken) -> SessionStats {
        let subscribed = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(Error::Cancelled),
            result = self.read_subscription() => result,
        };

        let subscription = match subscribed {
            Ok(Some(channel)) => {
                let handle = SubscriberHandle::new(self.state.id, &self.writer);
                let subscription =
                    Subscription::register(Arc::clone(&self.registry), channel.clone(), handle);
                self.state.on_subscribe(channel);

                tracing::info!(
                    session_id = self.state.id,
                    peer = %self.state.peer_addr,
                    channel = %subscription.channel(),
                    "Remote subscribed"
                );
                Some(subscription)
            }
            Ok(None) => {
                self.state.close(DisconnectReason::EndOfMessages);
                None
            }
            Err(e) => {
                let reason = self.disconnect_reason(&e);
                self.state.close(reason);
                None
            }
        };

        if subscription.is_some() {
            self.state.start_serving();

            // Cancelling mid-dispatch can leave a recipient with a partial
            // frame; only happens on shutdown, when every session closes.
            let served = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Err(Error::Cancelled),
                result = self.serve() => result,
            };
            let reason = match served {
                Ok(()) => DisconnectReason::EndOfMessages,
                Err(e) => self.disconnect_reason(&e),
            };
            self.state.close(reason);
        }

        self.teardown(subscription).await
    }

    /// Read the subscribe message; `None` if the client sent an empty name
    async fn read_subscription(&mut self) -> Result<Option<ChannelName>> {
        let channel = ChannelName::from(codec::read_message(&mut self.reader).await?);

        if channel.is_empty() {
            tracing::debug!(
                session_id = self.state.id,
                peer = %self.state.peer_addr,
                "Empty subscribe channel, closing"
            );
            return Ok(None);
        }

        Ok(Some(channel))
    }

    /// Route destination/payload pairs until an empty destination arrives
    async fn serve(&mut self) -> Result<()> {
        loop {
            let destination = codec::read_message(&mut self.reader).await?;
            if destination.is_empty() {
                return Ok(());
            }
            let destination = ChannelName::from(destination);
            let payload = codec::read_message(&mut self.reader).await?;

            self.route(&destination, payload).await;
        }
    }

    async fn route(&mut self, destination: &ChannelName, payload: Bytes) {
        let preview = &payload[..payload.len().min(PREVIEW_LEN)];
        tracing::debug!(
            session_id = self.state.id,
            channel = %destination,
            preview = %String::from_utf8_lossy(preview),
            "Sending to channel"
        );

        let recipients = self.registry.recipients(destination);
        let fan_out = dispatch(&recipients, &payload).await;

        self.stats
            .record_round(payload.len(), fan_out.delivered, fan_out.failed);
    }

    fn disconnect_reason(&self, error: &Error) -> DisconnectReason {
        match error {
            Error::Cancelled => DisconnectReason::Cancelled,
            e if e.is_disconnect() => DisconnectReason::Truncated,
            e => {
                tracing::debug!(
                    session_id = self.state.id,
                    peer = %self.state.peer_addr,
                    error = %e,
                    "Read failed"
                );
                DisconnectReason::TransportError
            }
        }
    }

    async fn teardown(mut self, subscription: Option<Subscription>) -> SessionStats {
        // Leave the channel first so no new dispatch targets a closing writer
        drop(subscription);

        if let Err(e) = self.writer.lock().await.shutdown().await {
            tracing::debug!(
                session_id = self.state.id,
                error = %e,
                "Failed to close write side"
            );
        }

        self.state.finish();
        self.stats.duration = self.state.duration();

        let channel = self
            .state
            .channel()
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::info!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            channel = %channel,
            reason = ?self.state.disconnect_reason,
            messages = self.stats.messages_routed,
            deliveries = self.stats.deliveries,
            failed = self.stats.failed_deliveries,
            unrouted = self.stats.unrouted,
            "Remote disconnected"
        );

        self.stats
    }
}
