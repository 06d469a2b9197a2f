//! Length-prefixed message framing
//!
//! Every message on the wire is:
//!
//! ```text
//! +----------------------+----------------------+
//! | length N (u32, BE)   | N bytes of payload   |
//! +----------------------+----------------------+
//! ```
//!
//! Reads either return a complete payload or fail; no partial message is
//! ever handed to the caller.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::constants::{LENGTH_PREFIX_SIZE, READ_CHUNK_SIZE};

/// Encode a payload length as a 4-byte big-endian prefix
pub fn encode_length_prefix(len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE]> {
    let len = u32::try_from(len).map_err(|_| Error::MessageTooLarge(len))?;
    Ok(len.to_be_bytes())
}

/// Read one message from the stream
///
/// Fails with [`Error::TruncatedStream`] if the stream ends before the prefix
/// or the payload is complete.
pub async fn read_message<R>(reader: &mut R) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix).await?;
    let len = u32::from_be_bytes(prefix) as usize;

    if len == 0 {
        return Ok(Bytes::new());
    }

    // Grow the buffer as data arrives so a bogus prefix cannot force a
    // multi-gigabyte allocation up front.
    let mut payload = BytesMut::with_capacity(len.min(READ_CHUNK_SIZE));
    while payload.len() < len {
        let remaining = len - payload.len();
        payload.reserve(remaining.min(READ_CHUNK_SIZE));
        let n = (&mut *reader)
            .take(remaining as u64)
            .read_buf(&mut payload)
            .await?;
        if n == 0 {
            return Err(Error::TruncatedStream);
        }
    }

    Ok(payload.freeze())
}

/// Write one message and wait until the transport has accepted it
///
/// The caller must hold exclusive access to `writer` for the duration of the
/// call so prefix and payload stay contiguous on the wire.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let prefix = encode_length_prefix(payload.len())?;
    writer.write_all(&prefix).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
