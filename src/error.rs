use std::io::ErrorKind;

use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::batch::BatchResult;
use crate::protocol::packet::ErrPayloadBytes;
use crate::protocol::response::ErrPayload;

/// Server error code sent right before the server drops a connection whose packet was too large.
pub const ER_NET_PACKET_TOO_LARGE: u16 = 1153;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),

    #[error("IO error: {0}")]
    IoError(std::io::Error),

    #[error("Connection timed out while waiting for the server")]
    ConnectionTimeout,

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Data conversion error: {0}")]
    DataConversion(String),

    #[error("Protocol invariant violated: {0}")]
    ProtocolInvariant(String),

    #[error(
        "Packet of {size} bytes exceeds max_allowed_packet ({max} bytes), must_reconnect: {must_reconnect}"
    )]
    MaxPacketExceeded {
        size: usize,
        max: usize,
        must_reconnect: bool,
    },

    #[error("{} of {} batch commands failed", .0.failures().count(), .0.len())]
    BatchPartialFailure(Box<BatchResult>),

    #[error("Row field handle from generation {expected} used on row generation {actual}")]
    StaleRow { expected: u64, actual: u64 },

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("A bug in zero-mysql-core: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(eyre!("{:?}", err))
    }

    /// Whether retrying the whole operation on a (re)connected session may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::IoError(_) | Self::ConnectionTimeout | Self::ConnectionClosed => true,
            Self::MaxPacketExceeded { must_reconnect, .. } => *must_reconnect,
            _ => false,
        }
    }

    /// Whether the connection that produced this error can no longer be used.
    pub fn is_conn_broken(&self) -> bool {
        match self {
            Self::IoError(_)
            | Self::ConnectionTimeout
            | Self::ConnectionClosed
            | Self::UnexpectedEof
            | Self::InvalidPacket
            | Self::ProtocolInvariant(_)
            | Self::LibraryBug(_) => true,
            Self::ServerError(err) => err.error_code == ER_NET_PACKET_TOO_LARGE,
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Error::ConnectionTimeout,
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => Error::ConnectionClosed,
            _ => Error::IoError(err),
        }
    }
}

impl<'a> From<ErrPayloadBytes<'a>> for Error {
    fn from(value: ErrPayloadBytes) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;
