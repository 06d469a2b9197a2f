//! Subscriber registry for pub/sub routing
//!
//! The registry maps each channel name to the sessions subscribed to it and
//! resolves the recipients of every published payload.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SubscriberRegistry>
//!                     ┌──────────────────────────┐
//!                     │ channels: HashMap<Name,  │
//!                     │   ChannelEntry {         │
//!                     │     VecDeque<Handle>     │
//!                     │   }                      │
//!                     │ >                        │
//!                     └────────────┬─────────────┘
//!                                  │ Weak
//!         ┌────────────────────────┼────────────────────────┐
//!         ▼                        ▼                        ▼
//!   [Session A]              [Session B]              [Session C]
//!   SharedWriter             SharedWriter             SharedWriter
//! ```
//!
//! Broadcast channels deliver to a snapshot of every subscriber. Channels
//! whose name starts with `/queue` deliver to one subscriber, rotating
//! through them in subscription order.
//!
//! # Zero-Copy Fan-out
//!
//! Payloads are `bytes::Bytes`, so every recipient in a round shares the
//! same allocation.

pub mod channel;
pub mod entry;
pub mod handle;
pub mod store;

pub use channel::ChannelName;
pub use entry::ChannelEntry;
pub use handle::{shared_writer, BoxedWriter, SharedWriter, SubscriberHandle};
pub use store::{SubscriberRegistry, Subscription};
