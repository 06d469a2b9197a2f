//! Length-prefixed TCP publish/subscribe broker
//!
//! Clients connect, name the channel they subscribe to, then send pairs of
//! destination channel and payload. Payloads are fanned out to every
//! subscriber of the destination, except for channels whose name starts with
//! `/queue`, which hand each payload to a single subscriber in round-robin
//! order.
//!
//! # Example
//! ```no_run
//! use pubsub_broker::{BrokerServer, ServerConfig};
//!
//! # async fn example() -> pubsub_broker::error::Result<()> {
//! let server = BrokerServer::bind(ServerConfig::default()).await?;
//! server.run_until_ctrl_c().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Modules:
//!
//! - [`protocol`] frames messages on the byte stream.
//! - [`registry`] maps channels to subscriber handles.
//! - [`server`] runs the listener and the per-connection sessions.
//! - [`client`] speaks the protocol from the client side.

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use server::{BrokerServer, ServerConfig};
