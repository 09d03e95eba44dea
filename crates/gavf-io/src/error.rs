//! Error types for the io layer.

use thiserror::Error;

/// Result type for io operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the io layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport error from the operating system.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Orderly end of stream where more data was required.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A non-blocking operation would have blocked.
    #[error("operation would block")]
    WouldBlock,

    /// An operation did not complete within its timeout.
    #[error("operation timed out")]
    Timeout,

    /// The backend does not support the requested operation.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// A variable-length integer did not terminate within its width.
    #[error("variable-length integer overflow")]
    VarintOverflow,

    /// A line exceeded the caller's maximum length.
    #[error("line longer than {max} bytes")]
    LineTooLong { max: usize },

    /// Malformed data on the wire.
    #[error("parse error: {0}")]
    Parse(String),

    /// Buffer growth refused.
    #[error(transparent)]
    Alloc(#[from] gavf_value::AllocError),

    /// TLS transport failure.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    /// TLS peer verification failed.
    #[error("peer verification failed: {0}")]
    Auth(String),

    /// Decryption failed (bad padding or truncated ciphertext).
    #[error("decrypt error: {0}")]
    Decrypt(String),
}

impl Error {
    /// True for the orderly end-of-stream condition.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof)
            || matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
