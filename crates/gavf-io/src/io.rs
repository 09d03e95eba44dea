//! The polymorphic io object.

use std::io::SeekFrom;

use bitflags::bitflags;
use gavf_value::{Buffer, Dictionary};

use crate::{Error, Result};

bitflags! {
    /// Capability and state flags of an [`IoStream`].
    ///
    /// The low bits describe what the backend can do; `EOF` and `ERROR`
    /// are sticky state bits latched by the stream itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IoFlags: u32 {
        const CAN_READ       = 1 << 0;
        const CAN_WRITE      = 1 << 1;
        const CAN_SEEK       = 1 << 2;
        /// Messages can flow in both directions.
        const DUPLEX         = 1 << 3;
        const REGULAR        = 1 << 4;
        const SOCKET         = 1 << 5;
        const UNIX_SOCKET    = 1 << 6;
        const LOCAL          = 1 << 7;
        const PIPE           = 1 << 8;
        const TTY            = 1 << 9;

        const EOF            = 1 << 16;
        const ERROR          = 1 << 17;
    }
}

/// What a backend implements. Optional operations default to
/// [`Error::NotSupported`] or trivial behavior.
pub trait Backend: Send {
    /// Blocking read. Returns the number of bytes read; 0 means EOF.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Blocking write. Returns the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::NotSupported("seek"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Readiness. Negative timeout waits forever, zero tries once.
    fn poll(&mut self, _timeout_ms: i32, _write: bool) -> Result<bool> {
        Ok(true)
    }

    /// Non-blocking read; [`Error::WouldBlock`] when nothing is pending.
    fn read_nonblock(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read(buf)
    }

    /// Non-blocking write; [`Error::WouldBlock`] when the backend is full.
    fn write_nonblock(&mut self, buf: &[u8]) -> Result<usize> {
        self.write(buf)
    }

    /// Finalize the backend (flush trailing cipher blocks etc.).
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// For memory-backed sinks: hand out the accumulated bytes.
    fn take_buffer(&mut self) -> Option<Buffer> {
        None
    }
}

/// A byte stream with capability flags, sticky error state, position
/// tracking and a pushback buffer.
///
/// All layered forms (sub-streams, ciphers, TLS) are separate backends
/// wrapping another `IoStream` by composition.
pub struct IoStream {
    backend: Box<dyn Backend>,
    flags: IoFlags,
    position: i64,
    total_bytes: i64,
    info: Dictionary,
    /// Bytes pushed back by peek/unread; consumed before the backend.
    pushback: Vec<u8>,
}

impl IoStream {
    /// Wrap a backend with the given capability flags.
    pub fn new(backend: Box<dyn Backend>, flags: IoFlags) -> Self {
        Self {
            backend,
            flags,
            position: 0,
            total_bytes: 0,
            info: Dictionary::new(),
            pushback: Vec::new(),
        }
    }

    pub fn flags(&self) -> IoFlags {
        self.flags
    }

    pub fn set_error(&mut self) {
        self.flags.insert(IoFlags::ERROR);
    }

    pub fn clear_error(&mut self) {
        self.flags.remove(IoFlags::ERROR);
    }

    pub fn got_error(&self) -> bool {
        self.flags.contains(IoFlags::ERROR)
    }

    pub fn set_eof(&mut self) {
        self.flags.insert(IoFlags::EOF);
    }

    pub fn clear_eof(&mut self) {
        self.flags.remove(IoFlags::EOF);
    }

    pub fn got_eof(&self) -> bool {
        self.flags.contains(IoFlags::EOF)
    }

    pub fn can_seek(&self) -> bool {
        self.flags.contains(IoFlags::CAN_SEEK)
    }

    pub fn is_duplex(&self) -> bool {
        self.flags.contains(IoFlags::DUPLEX)
    }

    /// Current byte position, counted from open (or the last
    /// [`reset_position`](Self::reset_position)).
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Zero the position counter, e.g. after protocol handshake bytes.
    pub fn reset_position(&mut self) {
        self.position = 0;
    }

    /// Total stream length in bytes; 0 when unknown.
    pub fn total_bytes(&self) -> i64 {
        self.total_bytes
    }

    pub fn set_info(&mut self, total_bytes: i64, filename: Option<&str>, mimetype: Option<&str>) {
        self.total_bytes = total_bytes;
        if let Some(f) = filename {
            self.info.set_string("filename", f);
        }
        if let Some(m) = mimetype {
            self.info.set_string("mimetype", m);
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.info.get_string("filename")
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.info.get_string("mimetype")
    }

    pub fn info(&self) -> &Dictionary {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut Dictionary {
        &mut self.info
    }

    fn take_pushback(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pushback.len().min(buf.len());
        if n > 0 {
            buf[..n].copy_from_slice(&self.pushback[..n]);
            self.pushback.drain(..n);
        }
        n
    }

    /// Read up to `buf.len()` bytes, looping over short reads.
    ///
    /// Returns the number of bytes read; less than requested only at end
    /// of stream. Once the stream is in the error state, every call
    /// short-circuits to the same error without side effects.
    pub fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.got_error() {
            return Err(Error::Io(std::io::Error::other("stream in error state")));
        }
        let mut done = self.take_pushback(buf);
        while done < buf.len() {
            match self.backend.read(&mut buf[done..]) {
                Ok(0) => {
                    self.set_eof();
                    break;
                }
                Ok(n) => done += n,
                Err(e) if e.is_eof() => {
                    self.set_eof();
                    break;
                }
                Err(e) => {
                    self.set_error();
                    return Err(e);
                }
            }
        }
        self.position += done as i64;
        Ok(done)
    }

    /// Read exactly `buf.len()` bytes or fail with [`Error::UnexpectedEof`].
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = self.read_data(buf)?;
        if n < buf.len() {
            return Err(Error::UnexpectedEof);
        }
        Ok(())
    }

    /// Fill `buf` without consuming: the bytes stay available for the next
    /// read. Returns how many bytes could be seen.
    pub fn peek_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.read_data(buf)?;
        self.unread_data(&buf[..n]);
        // Peeking does not consume: an EOF observed here is not sticky
        // unless nothing at all was readable.
        if n > 0 {
            self.clear_eof();
        }
        Ok(n)
    }

    /// Push bytes back onto the stream; the next read returns them first.
    pub fn unread_data(&mut self, buf: &[u8]) {
        self.pushback.splice(0..0, buf.iter().copied());
        self.position -= buf.len() as i64;
    }

    /// Write the whole of `buf` or fail.
    pub fn write_data(&mut self, buf: &[u8]) -> Result<()> {
        if self.got_error() {
            return Err(Error::Io(std::io::Error::other("stream in error state")));
        }
        let mut done = 0;
        while done < buf.len() {
            match self.backend.write(&buf[done..]) {
                Ok(0) => {
                    self.set_error();
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "write returned 0",
                    )));
                }
                Ok(n) => done += n,
                Err(e) => {
                    self.set_error();
                    return Err(e);
                }
            }
        }
        self.position += done as i64;
        Ok(())
    }

    /// Non-blocking read of whatever is pending.
    pub fn read_nonblock(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.pushback.is_empty() {
            let n = self.take_pushback(buf);
            self.position += n as i64;
            return Ok(n);
        }
        let n = self.backend.read_nonblock(buf)?;
        if n == 0 {
            self.set_eof();
        }
        self.position += n as i64;
        Ok(n)
    }

    /// Non-blocking write of whatever fits.
    pub fn write_nonblock(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.backend.write_nonblock(buf)?;
        self.position += n as i64;
        Ok(n)
    }

    /// Discard `bytes` bytes, seeking when possible.
    pub fn skip(&mut self, bytes: i64) -> Result<()> {
        if bytes <= 0 {
            return Ok(());
        }
        let from_pushback = (self.pushback.len() as i64).min(bytes);
        self.pushback.drain(..from_pushback as usize);
        self.position += from_pushback;
        let mut left = bytes - from_pushback;
        if left == 0 {
            return Ok(());
        }
        if self.can_seek() {
            self.backend.seek(SeekFrom::Current(left))?;
            self.position += left;
            return Ok(());
        }
        let mut scratch = [0u8; 1024];
        while left > 0 {
            let chunk = (left as usize).min(scratch.len());
            let n = self.read_data(&mut scratch[..chunk])?;
            if n == 0 {
                return Err(Error::UnexpectedEof);
            }
            // read_data already advanced the position
            left -= n as i64;
        }
        Ok(())
    }

    /// Absolute seek. Clears the pushback buffer and the EOF latch.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<i64> {
        if !self.can_seek() {
            return Err(Error::NotSupported("seek"));
        }
        self.pushback.clear();
        let new_pos = self.backend.seek(pos)?;
        self.position = new_pos as i64;
        self.clear_eof();
        Ok(self.position)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.backend.flush()
    }

    /// Finalize the backend in place (emit trailing cipher blocks etc.)
    /// without consuming the stream.
    pub fn finalize(&mut self) -> Result<()> {
        self.backend.close()
    }

    /// Finalize the stream, flushing any trailing backend state.
    pub fn close(mut self) -> Result<()> {
        self.backend.close()?;
        self.backend.flush()
    }

    /// Readiness for reading. Pushed-back bytes count as readable.
    pub fn can_read(&mut self, timeout_ms: i32) -> Result<bool> {
        if !self.pushback.is_empty() {
            return Ok(true);
        }
        self.backend.poll(timeout_ms, false)
    }

    /// Readiness for writing.
    pub fn can_write(&mut self, timeout_ms: i32) -> Result<bool> {
        self.backend.poll(timeout_ms, true)
    }

    /// For memory-backed sinks: hand out the accumulated bytes.
    pub fn take_buffer(&mut self) -> Option<Buffer> {
        self.backend.take_buffer()
    }

    /// Read one LF-terminated line, stripping a trailing CR.
    ///
    /// Returns `None` at end of stream with nothing read.
    pub fn read_line(&mut self, max_len: usize) -> Result<Option<String>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = self.read_data(&mut byte)?;
            if n == 0 {
                if line.is_empty() {
                    return Ok(None);
                }
                break;
            }
            if byte[0] == b'\n' {
                break;
            }
            if line.len() >= max_len {
                return Err(Error::LineTooLong { max: max_len });
            }
            line.push(byte[0]);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Skip up to 7 bytes to bring the read position to an 8-byte boundary.
    pub fn align_read(&mut self) -> Result<()> {
        let rest = self.position.rem_euclid(8);
        if rest != 0 {
            self.skip(8 - rest)?;
        }
        Ok(())
    }

    /// Emit up to 7 zero bytes to bring the write position to an 8-byte
    /// boundary.
    pub fn align_write(&mut self) -> Result<()> {
        let rest = self.position.rem_euclid(8);
        if rest != 0 {
            let zeros = [0u8; 7];
            self.write_data(&zeros[..(8 - rest) as usize])?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for IoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoStream")
            .field("flags", &self.flags)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem;

    #[test]
    fn peek_does_not_consume() {
        let mut io = mem::read(b"abcdef".to_vec());
        let mut peeked = [0u8; 3];
        assert_eq!(io.peek_data(&mut peeked).unwrap(), 3);
        assert_eq!(&peeked, b"abc");
        assert_eq!(io.position(), 0);

        let mut read = [0u8; 6];
        io.read_exact(&mut read).unwrap();
        assert_eq!(&read, b"abcdef");
    }

    #[test]
    fn error_state_is_sticky() {
        let mut io = mem::read(b"ab".to_vec());
        io.set_error();
        let mut buf = [0u8; 1];
        assert!(io.read_data(&mut buf).is_err());
        assert!(io.read_data(&mut buf).is_err());
    }

    #[test]
    fn eof_is_latched() {
        let mut io = mem::read(b"ab".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(io.read_data(&mut buf).unwrap(), 2);
        assert!(io.got_eof());
    }

    #[test]
    fn read_line_strips_cr() {
        let mut io = mem::read(b"hello\r\nworld\n".to_vec());
        assert_eq!(io.read_line(64).unwrap().as_deref(), Some("hello"));
        assert_eq!(io.read_line(64).unwrap().as_deref(), Some("world"));
        assert_eq!(io.read_line(64).unwrap(), None);
    }

    #[test]
    fn read_line_enforces_max() {
        let mut io = mem::read(vec![b'x'; 100]);
        assert!(matches!(
            io.read_line(10),
            Err(Error::LineTooLong { max: 10 })
        ));
    }

    #[test]
    fn alignment() {
        let mut io = mem::write();
        io.write_data(b"abc").unwrap();
        io.align_write().unwrap();
        assert_eq!(io.position(), 8);
        let buf = io.take_buffer().unwrap();
        assert_eq!(buf.as_slice(), b"abc\0\0\0\0\0");
    }
}
