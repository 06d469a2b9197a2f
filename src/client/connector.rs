//! Broker connection
//!
//! # Example
//! ```no_run
//! use pubsub_broker::client::BrokerClient;
//! use pubsub_broker::registry::ChannelName;
//!
//! # async fn example() -> pubsub_broker::error::Result<()> {
//! let mut worker = BrokerClient::connect("127.0.0.1:25000", "/queue/jobs").await?;
//! let mut producer = BrokerClient::connect("127.0.0.1:25000", "producers").await?;
//!
//! producer.publish(&ChannelName::from("/queue/jobs"), b"job1").await?;
//! let job = worker.recv().await?;
//! assert_eq!(&job[..], b"job1");
//! # Ok(())
//! # }
//! ```

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{Error, Result};
use crate::protocol::codec;
use crate::registry::ChannelName;

/// A client connected and subscribed to one channel
pub struct BrokerClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    channel: ChannelName,
}

impl BrokerClient {
    /// Connect to a broker and subscribe to `channel`
    pub async fn connect<A>(addr: A, channel: impl Into<ChannelName>) -> Result<Self>
    where
        A: ToSocketAddrs,
    {
        let channel = channel.into();
        if channel.is_empty() {
            return Err(empty_channel());
        }

        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, mut writer) = stream.into_split();

        codec::write_message(&mut writer, channel.as_bytes()).await?;
        tracing::debug!(channel = %channel, "Subscribed");

        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            channel,
        })
    }

    /// Channel this client is subscribed to
    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Send `payload` to every subscriber of `destination`
    ///
    /// For `/queue` destinations only one subscriber receives it. The broker
    /// does not acknowledge.
    pub async fn publish(&mut self, destination: &ChannelName, payload: &[u8]) -> Result<()> {
        // An empty destination tells the broker we are done
        if destination.is_empty() {
            return Err(empty_channel());
        }

        codec::write_message(&mut self.writer, destination.as_bytes()).await?;
        codec::write_message(&mut self.writer, payload).await
    }

    /// Wait for the next payload delivered to this client's channel
    ///
    /// Returns [`Error::TruncatedStream`] once the broker closes the connection.
    pub async fn recv(&mut self) -> Result<Bytes> {
        codec::read_message(&mut self.reader).await
    }

    /// Tell the broker we are done and close the write side
    pub async fn close(mut self) -> Result<()> {
        codec::write_message(&mut self.writer, &[]).await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

fn empty_channel() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        "channel name must not be empty",
    ))
}
