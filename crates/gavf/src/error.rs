//! Error types for the container layer.

use thiserror::Error;

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the container layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure from the io layer.
    #[error(transparent)]
    Io(#[from] gavf_io::Error),

    /// Malformed chunk, unknown type tag, length mismatch or invalid
    /// dictionary structure.
    #[error("parse error: {0}")]
    Parse(String),

    /// The operation is not legal in the current reader/writer state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A packet referenced a stream id the program header does not carry.
    #[error("unknown stream id {0}")]
    UnknownStream(i32),

    /// The uri scheme is not one of ours.
    #[error("unsupported uri: {0}")]
    UnsupportedUri(String),

    /// Packet extradata that the transport cannot carry (file descriptors
    /// off a unix socket).
    #[error("{0}")]
    Unsupported(&'static str),
}

impl Error {
    /// True for orderly end-of-stream conditions.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.is_eof())
    }
}

/// Status of a source-like call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Ok,
    /// Nothing available right now; try again later.
    Again,
    Eof,
}

/// Status of a sink-like call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    Ok,
    Error,
    /// The consumer asked the producer to stop.
    Stopped,
}
