//! Error types
//!
//! Truncation and cancellation are ordinary disconnect reasons for a session;
//! the remaining variants describe transport faults.

use std::fmt;
use std::io;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Debug)]
pub enum Error {
    /// Transport failure other than an early end of stream
    Io(io::Error),
    /// Stream ended before a length prefix or payload was fully read
    TruncatedStream,
    /// Session was asked to stop
    Cancelled,
    /// Outbound payload does not fit a 4-byte length prefix
    MessageTooLarge(usize),
    /// Delivery to a single subscriber failed
    Dispatch(DispatchError),
}

/// Failure delivering a payload to one subscriber
#[derive(Debug)]
pub enum DispatchError {
    /// The owning session already released its writer
    SubscriberGone,
    /// Writing to the subscriber failed
    Io(io::Error),
}

impl Error {
    /// Whether this error is a normal way for a session to end
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::TruncatedStream | Error::Cancelled => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::TruncatedStream => write!(f, "Stream closed mid-message"),
            Error::Cancelled => write!(f, "Session cancelled"),
            Error::MessageTooLarge(len) => {
                write!(f, "Message of {} bytes exceeds 4-byte length prefix", len)
            }
            Error::Dispatch(e) => write!(f, "Dispatch failed: {}", e),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::SubscriberGone => write!(f, "subscriber disconnected"),
            DispatchError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Dispatch(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Io(e) => Some(e),
            DispatchError::SubscriberGone => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedStream
        } else {
            Error::Io(e)
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Error::Dispatch(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_eof_is_truncation() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, Error::TruncatedStream));
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_other_io_errors_preserved() {
        let err: Error = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn test_cancelled_is_disconnect() {
        assert!(Error::Cancelled.is_disconnect());
        assert!(!Error::MessageTooLarge(0).is_disconnect());
    }

    #[test]
    fn test_reset_counts_as_disconnect() {
        let err: Error = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(err.is_disconnect());
    }
}
