//! Session state machine
//!
//! Tracks a client session from accept to teardown:
//!
//! ```text
//! Connecting ──► Subscribed ──► Serving ──► Closing ──► Closed
//!      │                                       ▲
//!      └───────────────────────────────────────┘
//!            (stream ended before subscribing)
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::ChannelName;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP connected, waiting for the subscribe message
    Connecting,
    /// Registered on its channel
    Subscribed,
    /// Routing destination/payload pairs
    Serving,
    /// Releasing the connection and the registration
    Closing,
    /// Session closed
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client sent an empty channel name
    EndOfMessages,
    /// Client went away, possibly mid-message
    Truncated,
    /// Server asked the session to stop
    Cancelled,
    /// Transport error on the session's own connection
    TransportError,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Channel the session subscribed to; set once
    channel: Option<ChannelName>,

    /// Why the session ended, once known
    pub disconnect_reason: Option<DisconnectReason>,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connecting,
            connected_at: Instant::now(),
            channel: None,
            disconnect_reason: None,
        }
    }

    /// Record the subscription
    ///
    /// Only valid while connecting; a session never changes its channel.
    pub fn on_subscribe(&mut self, channel: ChannelName) -> bool {
        if self.phase != SessionPhase::Connecting || self.channel.is_some() {
            return false;
        }
        self.channel = Some(channel);
        self.phase = SessionPhase::Subscribed;
        true
    }

    /// Begin routing messages
    pub fn start_serving(&mut self) {
        if self.phase == SessionPhase::Subscribed {
            self.phase = SessionPhase::Serving;
        }
    }

    /// Start closing the session
    ///
    /// The first reason recorded wins.
    pub fn close(&mut self, reason: DisconnectReason) {
        if matches!(self.phase, SessionPhase::Closing | SessionPhase::Closed) {
            return;
        }
        self.phase = SessionPhase::Closing;
        self.disconnect_reason.get_or_insert(reason);
    }

    /// Teardown finished
    pub fn finish(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Subscribed channel, if the session got that far
    pub fn channel(&self) -> Option<&ChannelName> {
        self.channel.as_ref()
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn state() -> SessionState {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 25000);
        SessionState::new(1, addr)
    }

    #[test]
    fn test_session_lifecycle() {
        let mut state = state();
        assert_eq!(state.phase, SessionPhase::Connecting);

        assert!(state.on_subscribe(ChannelName::from("chatroom")));
        assert_eq!(state.phase, SessionPhase::Subscribed);

        state.start_serving();
        assert_eq!(state.phase, SessionPhase::Serving);

        state.close(DisconnectReason::Truncated);
        assert_eq!(state.phase, SessionPhase::Closing);

        state.finish();
        assert_eq!(state.phase, SessionPhase::Closed);
        assert_eq!(state.channel(), Some(&ChannelName::from("chatroom")));
        assert_eq!(state.disconnect_reason, Some(DisconnectReason::Truncated));
    }

    #[test]
    fn test_subscription_is_fixed() {
        let mut state = state();
        assert!(state.on_subscribe(ChannelName::from("a")));
        state.start_serving();

        assert!(!state.on_subscribe(ChannelName::from("b")));
        assert_eq!(state.channel(), Some(&ChannelName::from("a")));
        assert_eq!(state.phase, SessionPhase::Serving);
    }

    #[test]
    fn test_close_before_subscribe() {
        let mut state = state();
        state.close(DisconnectReason::Truncated);
        state.finish();

        assert!(state.channel().is_none());
        assert!(!state.on_subscribe(ChannelName::from("late")));
    }

    #[test]
    fn test_first_close_reason_wins() {
        let mut state = state();
        state.close(DisconnectReason::Cancelled);
        state.close(DisconnectReason::Truncated);

        assert_eq!(state.disconnect_reason, Some(DisconnectReason::Cancelled));
    }
}
