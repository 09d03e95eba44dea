//! Error types for the value model.

use thiserror::Error;

/// Result type for value model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the value model.
///
/// Accessors that are handed a wrong type or an out-of-range index return
/// `Option`/`bool` instead of an error; the only thing that can actually
/// fail down here is memory growth.
#[derive(Debug, Error)]
pub enum Error {
    /// Buffer growth was refused by the allocator.
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Buffer growth was refused by the allocator.
#[derive(Debug, Error)]
#[error("allocation of {requested} bytes refused")]
pub struct AllocError {
    /// The capacity that was requested.
    pub requested: usize,
}
