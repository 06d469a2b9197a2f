//! Broker client implementation
//!
//! Provides a small async client for the broker's wire protocol, used by the
//! command-line tool and by integration tests.

pub mod connector;

pub use connector::BrokerClient;
