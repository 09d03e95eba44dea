//! The packet index carried by the `GAVFPIDX` chunk.

use gavf_io::IoStream;
use gavf_value::Buffer;

use crate::packet::{Packet, PacketFlags};
use crate::Result;

/// One index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub stream_id: i32,
    /// Same bits as the packet flags.
    pub flags: u32,
    /// Payload size in bytes.
    pub size: u32,
    /// File position of the packet frame.
    pub position: u64,
    pub pts: i64,
    pub duration: i64,
}

impl IndexEntry {
    pub fn is_keyframe(&self) -> bool {
        PacketFlags::from_bits_retain(self.flags).contains(PacketFlags::KEYFRAME)
    }
}

/// Index over all packets of a file, for O(log n)-ish seeks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketIndex {
    pub flags: u32,
    entries: Vec<IndexEntry>,
}

impl PacketIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&IndexEntry> {
        self.entries.get(idx)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn add(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    /// Record a packet that is about to be written at `position`.
    pub fn add_packet(&mut self, p: &Packet, position: u64) {
        self.add(IndexEntry {
            stream_id: p.id,
            flags: p.flags.bits(),
            size: p.buf.len() as u32,
            position,
            pts: p.pts,
            duration: p.duration,
        });
    }

    /// First entry of a stream.
    pub fn first_of_stream(&self, stream_id: i32) -> Option<usize> {
        self.entries.iter().position(|e| e.stream_id == stream_id)
    }

    /// Last entry of a stream.
    pub fn last_of_stream(&self, stream_id: i32) -> Option<usize> {
        self.entries.iter().rposition(|e| e.stream_id == stream_id)
    }

    /// Last entry of `stream_id` with `pts <= target`; the first entry of
    /// the stream when everything is past the target.
    pub fn seek_pts(&self, stream_id: i32, target: i64) -> Option<usize> {
        let mut found = None;
        for (idx, e) in self.entries.iter().enumerate() {
            if e.stream_id != stream_id {
                continue;
            }
            if e.pts <= target {
                found = Some(idx);
            } else if found.is_some() {
                break;
            } else {
                // Everything is past the target; clamp to the start.
                return Some(idx);
            }
        }
        found
    }

    /// Walk backwards from `idx` to the nearest keyframe of the same
    /// stream. Falls back to `idx` itself when none is marked.
    pub fn keyframe_before(&self, idx: usize) -> usize {
        let Some(start) = self.entries.get(idx) else {
            return idx;
        };
        let stream_id = start.stream_id;
        let mut cur = idx;
        loop {
            let e = &self.entries[cur];
            if e.stream_id == stream_id && e.is_keyframe() {
                return cur;
            }
            if cur == 0 {
                return idx;
            }
            cur -= 1;
        }
    }

    /// Serialize: flags and count, then the entries.
    pub fn write(&self, io: &mut IoStream) -> Result<()> {
        io.write_u32v(self.flags)?;
        io.write_u32v(self.entries.len() as u32)?;
        for e in &self.entries {
            io.write_i32v(e.stream_id)?;
            io.write_u32v(e.flags)?;
            io.write_u32v(e.size)?;
            io.write_u64v(e.position)?;
            io.write_i64v(e.pts)?;
            io.write_i64v(e.duration)?;
        }
        Ok(())
    }

    pub fn read(io: &mut IoStream) -> Result<Self> {
        let flags = io.read_u32v()?;
        let count = io.read_u32v()? as usize;
        let mut index = Self {
            flags,
            entries: Vec::with_capacity(count.min(1 << 20)),
        };
        for _ in 0..count {
            index.add(IndexEntry {
                stream_id: io.read_i32v()?,
                flags: io.read_u32v()?,
                size: io.read_u32v()?,
                position: io.read_u64v()?,
                pts: io.read_i64v()?,
                duration: io.read_i64v()?,
            });
        }
        Ok(index)
    }

    pub fn to_buffer(&self) -> Result<Buffer> {
        let mut io = gavf_io::mem::write();
        self.write(&mut io)?;
        io.take_buffer()
            .ok_or_else(|| crate::Error::Parse("memory sink lost its buffer".into()))
    }

    /// Multi-line debug dump.
    pub fn dump(&self) -> String {
        let mut out = format!("packet index, {} entries:\n", self.entries.len());
        for (i, e) in self.entries.iter().enumerate() {
            out.push_str(&format!(
                "  No: {i:6} ID: {} K: {} O: {} T: {} D: {} S: {}\n",
                e.stream_id,
                u8::from(e.is_keyframe()),
                e.position,
                e.pts,
                e.duration,
                e.size
            ));
        }
        out
    }
}
