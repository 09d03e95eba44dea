//! File backed streams.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{Backend, Error, IoFlags, IoStream, Result};

struct FileBackend {
    file: File,
    can_seek: bool,
}

impl Backend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.file.write(buf)?)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        if !self.can_seek {
            return Err(Error::NotSupported("seek"));
        }
        Ok(self.file.seek(pos)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.file.flush()?)
    }
}

/// Wrap an already open file.
pub fn from_file(file: File, write: bool, can_seek: bool) -> IoStream {
    let mut flags = IoFlags::REGULAR | IoFlags::LOCAL;
    flags.insert(if write {
        IoFlags::CAN_WRITE
    } else {
        IoFlags::CAN_READ
    });
    if can_seek {
        flags.insert(IoFlags::CAN_SEEK);
    }
    let total = file.metadata().map_or(0, |m| m.len() as i64);
    let mut io = IoStream::new(Box::new(FileBackend { file, can_seek }), flags);
    io.set_info(if write { 0 } else { total }, None, None);
    io
}

/// Open `filename` for reading or writing.
pub fn from_filename(filename: &Path, write: bool) -> Result<IoStream> {
    let file = if write {
        File::create(filename)?
    } else {
        File::open(filename)?
    };
    let mut io = from_file(file, write, true);
    if let Some(name) = filename.to_str() {
        io.set_info(io.total_bytes(), Some(name), None);
    }
    Ok(io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");

        let mut io = from_filename(&path, true).unwrap();
        io.write_data(b"some file contents").unwrap();
        io.close().unwrap();

        let mut io = from_filename(&path, false).unwrap();
        assert_eq!(io.total_bytes(), 18);
        assert!(io.can_seek());
        let mut out = [0u8; 4];
        io.seek(SeekFrom::Start(5)).unwrap();
        io.read_exact(&mut out).unwrap();
        assert_eq!(&out, b"file");
    }

    #[test]
    fn non_seekable_file_refuses_seek() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut io = from_file(File::open(&path).unwrap(), false, false);
        assert!(!io.can_seek());
        assert!(matches!(
            io.seek(SeekFrom::Start(0)),
            Err(Error::NotSupported(_))
        ));
    }
}
