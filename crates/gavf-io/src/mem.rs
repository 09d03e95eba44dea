//! Memory and buffer backed streams.

use std::io::SeekFrom;

use gavf_value::Buffer;

use crate::{Backend, Error, IoFlags, IoStream, Result};

struct MemRead {
    data: Vec<u8>,
    pos: usize,
}

impl Backend for MemRead {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::NotSupported("write"))
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = self.data.len() as i64;
        let target = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::Current(d) => self.pos as i64 + d,
            SeekFrom::End(d) => len + d,
        };
        if target < 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start",
            )));
        }
        self.pos = (target.min(len)) as usize;
        Ok(self.pos as u64)
    }
}

struct MemWrite {
    buf: Buffer,
    pos: usize,
}

impl Backend for MemWrite {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::NotSupported("read"))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.pos < self.buf.len() {
            // Overwrite after a backwards seek, extending as needed.
            let overlap = (self.buf.len() - self.pos).min(buf.len());
            self.buf.as_mut_slice()[self.pos..self.pos + overlap]
                .copy_from_slice(&buf[..overlap]);
            self.buf.append(&buf[overlap..]);
        } else {
            self.buf.append(buf);
        }
        self.pos += buf.len();
        Ok(buf.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = self.buf.len() as i64;
        let target = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::Current(d) => self.pos as i64 + d,
            SeekFrom::End(d) => len + d,
        };
        if target < 0 || target > len {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek out of range",
            )));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }

    fn take_buffer(&mut self) -> Option<Buffer> {
        self.pos = 0;
        Some(std::mem::take(&mut self.buf))
    }
}

/// Read from an in-memory byte vector.
pub fn read(data: Vec<u8>) -> IoStream {
    let total = data.len() as i64;
    let mut io = IoStream::new(
        Box::new(MemRead { data, pos: 0 }),
        IoFlags::CAN_READ | IoFlags::CAN_SEEK | IoFlags::LOCAL,
    );
    io.set_info(total, None, None);
    io
}

/// Write into an internal growable buffer, retrievable with
/// [`IoStream::take_buffer`].
pub fn write() -> IoStream {
    IoStream::new(
        Box::new(MemWrite {
            buf: Buffer::new(),
            pos: 0,
        }),
        IoFlags::CAN_WRITE | IoFlags::CAN_SEEK | IoFlags::LOCAL,
    )
}

/// Read the remaining bytes of an external [`Buffer`] (from its read
/// position).
pub fn buffer_read(buf: &Buffer) -> IoStream {
    read(buf.remaining().to_vec())
}

/// Append into an existing [`Buffer`]; retrieve it (prior contents
/// included) with [`IoStream::take_buffer`].
pub fn buffer_write(buf: Buffer) -> IoStream {
    let pos = buf.len();
    IoStream::new(
        Box::new(MemWrite { buf, pos }),
        IoFlags::CAN_WRITE | IoFlags::CAN_SEEK | IoFlags::LOCAL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_write_read_round_trip() {
        let mut io = write();
        io.write_data(b"hello world").unwrap();
        let buf = io.take_buffer().unwrap();
        assert_eq!(buf.as_slice(), b"hello world");

        let mut rd = read(buf.into_vec());
        let mut out = [0u8; 11];
        rd.read_exact(&mut out).unwrap();
        assert_eq!(&out, b"hello world");
    }

    #[test]
    fn mem_write_patch_after_seek() {
        let mut io = write();
        io.write_data(b"AAAABBBB").unwrap();
        io.seek(SeekFrom::Start(2)).unwrap();
        io.write_data(b"xx").unwrap();
        io.seek(SeekFrom::End(0)).unwrap();
        io.write_data(b"C").unwrap();
        let buf = io.take_buffer().unwrap();
        assert_eq!(buf.as_slice(), b"AAxxBBBBC");
    }

    #[test]
    fn buffer_write_appends() {
        let mut initial = Buffer::new();
        initial.append(b"head:");
        let mut io = buffer_write(initial);
        io.write_data(b"tail").unwrap();
        let buf = io.take_buffer().unwrap();
        assert_eq!(buf.as_slice(), b"head:tail");
    }

    #[test]
    fn buffer_read_starts_at_pos() {
        let mut buf = Buffer::from_slice(b"0123456789");
        buf.set_pos(4);
        let mut io = buffer_read(&buf);
        let mut out = [0u8; 6];
        io.read_exact(&mut out).unwrap();
        assert_eq!(&out, b"456789");
    }
}
