//! Client session state
//!
//! The protocol loop itself lives in [`crate::server::connection`]; this
//! module tracks where a session is in its lifecycle and why it ended.

pub mod state;

pub use state::{DisconnectReason, SessionPhase, SessionState};
