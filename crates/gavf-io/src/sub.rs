//! Sub-streams: windows into another stream.

use std::io::SeekFrom;

use crate::{Backend, Error, IoFlags, IoStream, Result};

struct SubRead {
    inner: IoStream,
    /// Window start in the parent stream.
    offset: i64,
    /// Window length.
    len: i64,
    /// Position within the window.
    pos: i64,
}

impl Backend for SubRead {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let left = (self.len - self.pos).max(0) as usize;
        if left == 0 {
            return Ok(0);
        }
        let want = buf.len().min(left);
        let n = self.inner.read_data(&mut buf[..want])?;
        self.pos += n as i64;
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::NotSupported("write"))
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::Current(d) => self.pos + d,
            SeekFrom::End(d) => self.len + d,
        };
        if target < 0 || target > self.len {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek out of window",
            )));
        }
        self.inner.seek(SeekFrom::Start((self.offset + target) as u64))?;
        self.pos = target;
        Ok(self.pos as u64)
    }

    fn poll(&mut self, timeout_ms: i32, write: bool) -> Result<bool> {
        if !write && self.pos >= self.len {
            return Ok(true);
        }
        self.inner.can_read(timeout_ms).map(|r| r || write)
    }
}

struct SubWrite {
    inner: IoStream,
    written: i64,
}

impl Backend for SubWrite {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::NotSupported("read"))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.inner.write_data(buf)?;
        self.written += buf.len() as i64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

impl IoStream {
    /// Clamp this stream to the window `[offset, offset + len)`.
    ///
    /// Seeks to `offset` on creation when the parent is seekable; reads
    /// return EOF at the end of the window without consuming parent bytes
    /// past it. The parent comes back via [`IoStream::into_inner`].
    pub fn sub_read(mut self, offset: i64, len: i64) -> Result<IoStream> {
        if self.can_seek() {
            self.seek(SeekFrom::Start(offset as u64))?;
        } else if offset > self.position() {
            self.skip(offset - self.position())?;
        }
        let seekable = self.can_seek();
        let mut flags = IoFlags::CAN_READ;
        if seekable {
            flags.insert(IoFlags::CAN_SEEK);
        }
        let mut io = IoStream::new(
            Box::new(SubRead {
                inner: self,
                offset,
                len,
                pos: 0,
            }),
            flags,
        );
        io.set_info(len, None, None);
        Ok(io)
    }

    /// Append into this stream from the current position, counting bytes
    /// written (reported as the sub-stream's position).
    pub fn sub_write(self) -> IoStream {
        IoStream::new(
            Box::new(SubWrite {
                inner: self,
                written: 0,
            }),
            IoFlags::CAN_WRITE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem;

    #[test]
    fn sub_read_is_bounded() {
        let data: Vec<u8> = (0u8..100).collect();
        let parent = mem::read(data);
        let mut sub = parent.sub_read(10, 10).unwrap();

        assert_eq!(sub.total_bytes(), 10);
        let mut out = [0u8; 16];
        let n = sub.read_data(&mut out).unwrap();
        assert_eq!(n, 10);
        assert_eq!(&out[..10], &(10u8..20).collect::<Vec<_>>()[..]);
        assert!(sub.got_eof());
    }

    #[test]
    fn sub_read_does_not_consume_past_window() {
        let data: Vec<u8> = (0u8..100).collect();
        let parent = mem::read(data);
        let mut sub = parent.sub_read(10, 10).unwrap();
        let mut out = [0u8; 10];
        sub.read_exact(&mut out).unwrap();
        // A further read sees EOF, not byte 20 of the parent.
        assert_eq!(sub.read_data(&mut out).unwrap(), 0);
    }

    #[test]
    fn sub_read_seeks_within_window() {
        let data: Vec<u8> = (0u8..100).collect();
        let parent = mem::read(data);
        let mut sub = parent.sub_read(20, 10).unwrap();
        sub.seek(SeekFrom::Start(5)).unwrap();
        assert_eq!(sub.read_u8().unwrap(), 25);
        assert!(sub.seek(SeekFrom::Start(11)).is_err());
    }

    #[test]
    fn sub_write_counts_bytes() {
        let parent = mem::write();
        let mut sub = parent.sub_write();
        sub.write_data(b"abc").unwrap();
        sub.write_data(b"de").unwrap();
        assert_eq!(sub.position(), 5);
    }
}
