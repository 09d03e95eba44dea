//! Compressed media packets.

use bitflags::bitflags;
use gavf_value::{Buffer, InterlaceMode};

use crate::time::TIME_UNDEFINED;
use crate::Result;

/// Zero bytes kept past the payload so SIMD decoders can over-read.
pub const PACKET_PADDING: usize = 32;

bitflags! {
    /// Packet flags. The two low bits carry the frame type; the rest are
    /// independent bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PacketFlags: u32 {
        const TYPE_I = 0x01;
        const TYPE_P = 0x02;
        const TYPE_B = 0x03;
        const TYPE_MASK = 0x03;
        /// Stream can be decoded starting here.
        const KEYFRAME = 1 << 2;
        /// Last packet of the stream.
        const LAST = 1 << 3;
        /// Extensions follow the flags on the wire.
        const EXT = 1 << 4;
        /// B-frame used as reference; cannot be skipped safely.
        const REF = 1 << 5;
        /// Produces no decoder output.
        const NOOUTPUT = 1 << 6;
        /// Carries file descriptors (unix sockets only).
        const HAS_FDS = 1 << 7;
        /// Field picture of an interlaced pair.
        const FIELD_PIC = 1 << 8;
        /// Undecodable (e.g. before the first keyframe).
        const SKIP = 1 << 9;
    }
}

/// Frame type held in the low bits of [`PacketFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameType {
    #[default]
    Unknown,
    I,
    P,
    B,
}

impl PacketFlags {
    pub fn frame_type(self) -> FrameType {
        match self.bits() & Self::TYPE_MASK.bits() {
            0x01 => FrameType::I,
            0x02 => FrameType::P,
            0x03 => FrameType::B,
            _ => FrameType::Unknown,
        }
    }

    pub fn with_frame_type(self, ft: FrameType) -> Self {
        let bits = self.bits() & !Self::TYPE_MASK.bits();
        let ty = match ft {
            FrameType::Unknown => 0,
            FrameType::I => 0x01,
            FrameType::P => 0x02,
            FrameType::B => 0x03,
        };
        Self::from_bits_retain(bits | ty)
    }
}

/// A rectangle within a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// One palette entry (16 bit per component).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaletteEntry {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    pub a: u16,
}

/// Optional per-packet side data. A packet carries at most one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Extradata {
    Palette(Vec<PaletteEntry>),
    /// File descriptors transported out of band over unix sockets.
    Fds(Vec<i32>),
}

/// One unit of compressed data with its own timing.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Payload, padded with [`PACKET_PADDING`] zero bytes past the length.
    pub buf: Buffer,
    pub flags: PacketFlags,
    /// Stream id this packet belongs to.
    pub id: i32,
    pub pts: i64,
    pub dts: i64,
    /// Original PES-level PTS where a transport stream carried one.
    pub pes_pts: Option<i64>,
    pub duration: i64,
    /// Byte position in the file, set by the muxer/demuxer.
    pub position: i64,
    /// Offset of the second field for interlaced paired fields.
    pub field2_offset: u32,
    /// Size of an in-band repeated codec header at the payload start.
    pub header_size: u32,
    /// End position of an in-band sequence end code.
    pub sequence_end_pos: u32,
    pub interlace_mode: InterlaceMode,
    pub timecode: Option<u64>,
    /// Source rectangle for cropped display.
    pub src_rect: Rectangle,
    /// Destination coordinates.
    pub dst_x: i32,
    pub dst_y: i32,
    pub extradata: Option<Extradata>,
}

impl Default for Packet {
    fn default() -> Self {
        Self {
            buf: Buffer::new(),
            flags: PacketFlags::empty(),
            id: 0,
            pts: TIME_UNDEFINED,
            dts: TIME_UNDEFINED,
            pes_pts: None,
            duration: 0,
            position: -1,
            field2_offset: 0,
            header_size: 0,
            sequence_end_pos: 0,
            interlace_mode: InterlaceMode::Unknown,
            timecode: None,
            src_rect: Rectangle::default(),
            dst_x: 0,
            dst_y: 0,
            extradata: None,
        }
    }
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve room for a payload of `len` bytes plus padding.
    pub fn alloc(&mut self, len: usize) -> Result<()> {
        self.buf
            .alloc(len + PACKET_PADDING)
            .map_err(gavf_io::Error::from)?;
        Ok(())
    }

    /// Set the payload, keeping the zero padding behind it.
    pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
        self.buf.reset();
        self.buf
            .append_pad(data, PACKET_PADDING)
            .map_err(gavf_io::Error::from)?;
        Ok(())
    }

    /// Clear all fields but keep the payload allocation.
    pub fn reset(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        *self = Self::default();
        self.buf = buf;
        self.buf.reset();
    }

    /// Copy everything except the payload buffer.
    pub fn copy_metadata(&mut self, src: &Packet) {
        let buf = std::mem::take(&mut self.buf);
        *self = src.clone();
        self.buf = buf;
    }

    /// Concatenate the second field of an interlaced pair.
    ///
    /// Records where field 2 starts and clears the field-picture flag;
    /// `field2` gives up its payload.
    pub fn merge_field2(&mut self, field2: &mut Packet) -> Result<()> {
        self.field2_offset = self.buf.len() as u32;
        self.buf
            .append_pad(field2.buf.as_slice(), PACKET_PADDING)
            .map_err(gavf_io::Error::from)?;
        field2.buf.reset();
        self.flags.remove(PacketFlags::FIELD_PIC);
        Ok(())
    }

    /// Attach side data. The single slot must be empty.
    pub fn add_extradata(&mut self, data: Extradata) -> bool {
        if self.extradata.is_some() {
            return false;
        }
        if matches!(data, Extradata::Fds(_)) {
            self.flags.insert(PacketFlags::HAS_FDS);
        }
        self.extradata = Some(data);
        true
    }

    pub fn palette(&self) -> Option<&[PaletteEntry]> {
        match &self.extradata {
            Some(Extradata::Palette(p)) => Some(p),
            _ => None,
        }
    }

    pub fn fds(&self) -> Option<&[i32]> {
        match &self.extradata {
            Some(Extradata::Fds(fds)) => Some(fds),
            _ => None,
        }
    }

    pub fn data(&self) -> &[u8] {
        self.buf.as_slice()
    }

    pub fn data_len(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> Packet {
        let mut p = Packet::new();
        p.id = 2;
        p.pts = 1024;
        p.duration = 1024;
        p.flags = PacketFlags::KEYFRAME.with_frame_type(FrameType::I);
        p.set_data(&[1, 2, 3, 4, 5]).unwrap();
        p
    }

    #[test]
    fn copy_is_bytewise_equal_modulo_capacity() {
        let p = sample_packet();
        let q = p.clone();
        assert_eq!(p, q);
        assert_eq!(p.data(), q.data());
    }

    #[test]
    fn alloc_reserves_padding() {
        let mut p = Packet::new();
        p.alloc(100).unwrap();
        assert!(p.buf.capacity() >= 100 + PACKET_PADDING);
        assert_eq!(p.data_len(), 0);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut p = sample_packet();
        let cap = p.buf.capacity();
        p.reset();
        assert_eq!(p.pts, TIME_UNDEFINED);
        assert_eq!(p.data_len(), 0);
        assert_eq!(p.buf.capacity(), cap);
        assert_eq!(p.flags, PacketFlags::empty());
    }

    #[test]
    fn copy_metadata_leaves_payload() {
        let src = sample_packet();
        let mut dst = Packet::new();
        dst.set_data(b"own payload").unwrap();
        dst.copy_metadata(&src);
        assert_eq!(dst.pts, src.pts);
        assert_eq!(dst.flags, src.flags);
        assert_eq!(dst.data(), b"own payload");
    }

    #[test]
    fn frame_type_field() {
        let flags = PacketFlags::KEYFRAME.with_frame_type(FrameType::B);
        assert_eq!(flags.frame_type(), FrameType::B);
        assert!(flags.contains(PacketFlags::KEYFRAME));
        let flags = flags.with_frame_type(FrameType::P);
        assert_eq!(flags.frame_type(), FrameType::P);
    }

    #[test]
    fn merge_field2_concatenates() {
        let mut field1 = Packet::new();
        field1.set_data(&[1, 1, 1]).unwrap();
        field1.flags.insert(PacketFlags::FIELD_PIC);

        let mut field2 = Packet::new();
        field2.set_data(&[2, 2]).unwrap();

        field1.merge_field2(&mut field2).unwrap();
        assert_eq!(field1.data(), &[1, 1, 1, 2, 2]);
        assert_eq!(field1.field2_offset, 3);
        assert!(!field1.flags.contains(PacketFlags::FIELD_PIC));
        assert_eq!(field2.data_len(), 0);
    }

    #[test]
    fn single_extradata_slot() {
        let mut p = Packet::new();
        assert!(p.add_extradata(Extradata::Palette(vec![PaletteEntry::default()])));
        assert!(!p.add_extradata(Extradata::Fds(vec![3])));
        assert!(p.palette().is_some());
        assert!(p.fds().is_none());
    }
}
