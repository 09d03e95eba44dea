//! Growable byte buffer with explicit read position and trailing padding.

use crate::error::AllocError;

/// A growable byte buffer.
///
/// Distinguishes the logical length (`len`), the current read position
/// (`pos`) and the allocated capacity. Binary values and packet payloads
/// are carried in these; packet payloads additionally reserve zeroed
/// padding past the logical length so decoders may over-read.
#[derive(Default)]
pub struct Buffer {
    data: Vec<u8>,
    pos: usize,
}

impl Buffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
        }
    }

    /// Grow the allocation to at least `min_capacity` bytes.
    ///
    /// Existing contents and the logical length are unchanged. Capacities
    /// already at or above `min_capacity` are kept as-is.
    pub fn alloc(&mut self, min_capacity: usize) -> Result<(), AllocError> {
        if min_capacity > self.data.capacity() {
            let additional = min_capacity - self.data.len();
            self.data
                .try_reserve_exact(additional)
                .map_err(|_| AllocError {
                    requested: min_capacity,
                })?;
        }
        Ok(())
    }

    /// Append `src` after the current logical end.
    pub fn append(&mut self, src: &[u8]) {
        self.data.extend_from_slice(src);
    }

    /// Append `src` and reserve `pad` trailing zero bytes.
    ///
    /// The padding is present in the allocation and zeroed, but not counted
    /// in [`len`](Self::len).
    pub fn append_pad(&mut self, src: &[u8], pad: usize) -> Result<(), AllocError> {
        let end = self.data.len() + src.len();
        self.alloc(end + pad)?;
        self.data.extend_from_slice(src);
        // Materialize the zero padding, then step back to the logical end.
        self.data.resize(end + pad, 0);
        self.data.truncate(end);
        Ok(())
    }

    /// Logical length → 0, read position → 0; capacity is retained.
    pub fn reset(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    /// Logical length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the logical length is zero.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Current read position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Set the read position. Clamped to the logical length.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Advance the read position by `n` bytes.
    pub fn advance(&mut self, n: usize) {
        self.set_pos(self.pos + n);
    }

    /// The bytes from the read position to the logical end.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// All logical bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// All logical bytes, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Set the logical length, zero-filling any newly exposed bytes.
    pub fn set_len(&mut self, len: usize) {
        self.data.resize(len, 0);
        self.pos = self.pos.min(len);
    }

    /// Drop `len` consumed bytes from the front, shifting the rest down.
    ///
    /// The read position moves with the data.
    pub fn flush(&mut self, len: usize) {
        let len = len.min(self.data.len());
        self.data.drain(..len);
        self.pos = self.pos.saturating_sub(len);
    }

    /// Consume the buffer, returning the logical bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        // Deep copy; the read position does not travel.
        Self {
            data: self.data.clone(),
            pos: 0,
        }
    }
}

/// Buffers compare by logical contents; capacity slack and the read
/// position are ignored.
impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Buffer {}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Buffer({} bytes)", self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_reset_keep_capacity() {
        let mut buf = Buffer::new();
        buf.append(b"hello");
        assert_eq!(buf.len(), 5);
        let cap = buf.capacity();
        buf.reset();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), cap);
    }

    #[test]
    fn append_pad_reserves_zeroed_tail() {
        let mut buf = Buffer::new();
        buf.append_pad(b"abc", 16).unwrap();
        assert_eq!(buf.len(), 3);
        assert!(buf.capacity() >= 3 + 16);
        assert_eq!(buf.as_slice(), b"abc");
    }

    #[test]
    fn alloc_grows_to_request() {
        let mut buf = Buffer::new();
        buf.alloc(1024).unwrap();
        assert!(buf.capacity() >= 1024);
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn flush_shifts_front() {
        let mut buf = Buffer::from_slice(b"0123456789");
        buf.set_pos(6);
        buf.flush(4);
        assert_eq!(buf.as_slice(), b"456789");
        assert_eq!(buf.pos(), 2);
    }

    #[test]
    fn compare_ignores_capacity_slack() {
        let mut a = Buffer::new();
        a.alloc(4096).unwrap();
        a.append(b"xyz");
        let b = Buffer::from_slice(b"xyz");
        assert_eq!(a, b);
    }
}
