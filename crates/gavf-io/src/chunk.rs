//! Chunk framing: `[8 ASCII bytes tag][i64 little-endian length][payload]`.
//!
//! Chunks start on 8-byte boundaries; padding bytes up to the boundary are
//! zeros. The length is signed and 0 means "unknown, extends to EOF" —
//! writers on non-seekable streams leave it that way, writers on seekable
//! streams patch it when the chunk is finished.

use std::io::SeekFrom;

use gavf_value::Buffer;

use crate::{Error, IoStream, Result};

/// One chunk header plus enough state to patch its length.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 8-byte ASCII tag.
    pub tag: [u8; 8],
    /// Stream position of the first payload byte.
    pub start: i64,
    /// Payload length; 0 while unknown.
    pub len: i64,
}

impl Chunk {
    /// True if this chunk carries `tag` (shorter tags match as prefixes of
    /// the space-padded stored tag).
    pub fn is(&self, tag: &str) -> bool {
        self.tag == pad_tag(tag)
    }

    /// The tag as a string.
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag)
            .trim_end_matches(' ')
            .to_owned()
    }
}

fn pad_tag(tag: &str) -> [u8; 8] {
    let mut out = [b' '; 8];
    let bytes = tag.as_bytes();
    let n = bytes.len().min(8);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

impl IoStream {
    /// Read a chunk header at the next 8-byte boundary.
    pub fn chunk_read_header(&mut self) -> Result<Chunk> {
        self.align_read()?;
        let mut tag = [0u8; 8];
        self.read_exact(&mut tag)?;
        let len = self.read_i64_le()?;
        Ok(Chunk {
            tag,
            start: self.position(),
            len,
        })
    }

    /// Begin a chunk: align, write the tag and a zero length placeholder.
    pub fn chunk_start(&mut self, tag: &str) -> Result<Chunk> {
        self.align_write()?;
        self.write_data(&pad_tag(tag))?;
        self.write_i64_le(0)?;
        Ok(Chunk {
            tag: pad_tag(tag),
            start: self.position(),
            len: 0,
        })
    }

    /// Finish a chunk: compute the payload length and, if `write_size` and
    /// the stream is seekable, seek back and patch it in.
    pub fn chunk_finish(&mut self, chunk: &mut Chunk, write_size: bool) -> Result<()> {
        chunk.len = self.position() - chunk.start;
        if write_size && self.can_seek() {
            let end = self.position();
            self.seek(SeekFrom::Start((chunk.start - 8) as u64))?;
            self.write_i64_le(chunk.len)?;
            self.seek(SeekFrom::Start(end as u64))?;
        }
        Ok(())
    }

    /// Begin a chunk whose payload is buffered in memory; the returned
    /// stream collects the payload for [`chunk_finish_io`](Self::chunk_finish_io).
    pub fn chunk_start_io(&mut self, tag: &str) -> (Chunk, IoStream) {
        (
            Chunk {
                tag: pad_tag(tag),
                start: 0,
                len: 0,
            },
            crate::mem::write(),
        )
    }

    /// Write a memory-buffered chunk with its final length in one piece.
    pub fn chunk_finish_io(&mut self, chunk: &mut Chunk, mut sub: IoStream) -> Result<()> {
        let buf = sub
            .take_buffer()
            .ok_or(Error::NotSupported("chunk sub io is not memory backed"))?;
        chunk.len = buf.len() as i64;
        self.align_write()?;
        self.write_data(&chunk.tag)?;
        self.write_i64_le(chunk.len)?;
        chunk.start = self.position();
        self.write_data(buf.as_slice())?;
        Ok(())
    }

    /// Read the payload of `chunk` into a buffer.
    ///
    /// A zero length means "extends to EOF" and reads everything left.
    pub fn chunk_read_payload(&mut self, chunk: &Chunk) -> Result<Buffer> {
        if chunk.len > 0 {
            let mut data = vec![0u8; chunk.len as usize];
            self.read_exact(&mut data)?;
            Ok(Buffer::from(data))
        } else {
            let mut data = Vec::new();
            let mut scratch = [0u8; 4096];
            loop {
                let n = self.read_data(&mut scratch)?;
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&scratch[..n]);
            }
            Ok(Buffer::from(data))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem;

    #[test]
    fn seekable_chunk_gets_patched_length() {
        let mut io = mem::write();
        let mut chunk = io.chunk_start("GAVFTEST").unwrap();
        io.write_data(b"payload").unwrap();
        io.chunk_finish(&mut chunk, true).unwrap();
        assert_eq!(chunk.len, 7);

        let buf = io.take_buffer().unwrap();
        let mut rd = mem::read(buf.into_vec());
        let head = rd.chunk_read_header().unwrap();
        assert!(head.is("GAVFTEST"));
        assert_eq!(head.len, 7);
        let payload = rd.chunk_read_payload(&head).unwrap();
        assert_eq!(payload.as_slice(), b"payload");
    }

    #[test]
    fn unknown_length_reads_to_eof() {
        // Simulate a non-seekable writer: the length stays 0.
        let mut io = mem::write();
        io.write_data(&pad_tag("GAVFTEST")).unwrap();
        io.write_i64_le(0).unwrap();
        io.write_data(b"until the end").unwrap();

        let buf = io.take_buffer().unwrap();
        let mut rd = mem::read(buf.into_vec());
        let head = rd.chunk_read_header().unwrap();
        assert_eq!(head.len, 0);
        let payload = rd.chunk_read_payload(&head).unwrap();
        assert_eq!(payload.as_slice(), b"until the end");
    }

    #[test]
    fn chunks_align_to_eight_bytes() {
        let mut io = mem::write();
        io.write_data(b"abc").unwrap();
        let mut chunk = io.chunk_start("GAVFTAGX").unwrap();
        io.write_data(b"xy").unwrap();
        io.chunk_finish(&mut chunk, true).unwrap();

        let buf = io.take_buffer().unwrap();
        assert_eq!(&buf.as_slice()[3..8], &[0, 0, 0, 0, 0]);
        assert_eq!(&buf.as_slice()[8..16], b"GAVFTAGX");

        let mut rd = mem::read(buf.into_vec());
        rd.skip(3).unwrap();
        let head = rd.chunk_read_header().unwrap();
        assert!(head.is("GAVFTAGX"));
        assert_eq!(head.len, 2);
    }

    #[test]
    fn buffered_chunk_has_length_up_front() {
        let mut io = mem::write();
        let (mut chunk, mut sub) = io.chunk_start_io("GAVFMEMC");
        sub.write_data(b"dictionary bytes").unwrap();
        io.chunk_finish_io(&mut chunk, sub).unwrap();
        assert_eq!(chunk.len, 16);

        let buf = io.take_buffer().unwrap();
        let mut rd = mem::read(buf.into_vec());
        let head = rd.chunk_read_header().unwrap();
        assert_eq!(head.len, 16);
    }
}
