//! Broker server
//!
//! Accepts TCP connections and runs one session task per connection, all
//! sharing a single [`SubscriberRegistry`](crate::registry::SubscriberRegistry).

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::{dispatch, Connection, FanOut};
pub use listener::BrokerServer;
