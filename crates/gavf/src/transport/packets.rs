//! Packet framing within the `GAVFPKTS` chunk.
//!
//! Each packet is introduced by the marker byte `'P'`, then stream id
//! (signed varint), pts (signed varint) and flags (unsigned varint). When
//! the extension bit is set, a count and `(key, len, payload)` extension
//! records follow. A varint payload length and the raw payload close the
//! frame. File descriptors announced by the FDS extension travel out of
//! band on unix sockets.

use gavf_io::{IoFlags, IoStream};
use gavf_value::InterlaceMode;

use crate::packet::{Extradata, Packet, PacketFlags, Rectangle};
use crate::{Error, Result};

/// Marker byte introducing a packet.
pub const PACKET_MARKER: u8 = b'P';

/* Extension keys */
const EXT_DURATION: u32 = 1;
const EXT_HEADER_SIZE: u32 = 2;
const EXT_SEQ_END: u32 = 3;
const EXT_TIMECODE: u32 = 4;
const EXT_SRC_RECT: u32 = 5;
const EXT_DST_COORDS: u32 = 6;
const EXT_INTERLACE: u32 = 8;
const EXT_FIELD2: u32 = 9;
const EXT_FDS: u32 = 10;

fn interlace_to_wire(mode: InterlaceMode) -> u32 {
    match mode {
        InterlaceMode::Unknown => 0,
        InterlaceMode::None => 1,
        InterlaceMode::TopFirst => 2,
        InterlaceMode::BottomFirst => 3,
        InterlaceMode::Mixed => 4,
        InterlaceMode::MixedTop => 5,
        InterlaceMode::MixedBottom => 6,
    }
}

fn interlace_from_wire(val: u32) -> InterlaceMode {
    match val {
        1 => InterlaceMode::None,
        2 => InterlaceMode::TopFirst,
        3 => InterlaceMode::BottomFirst,
        4 => InterlaceMode::Mixed,
        5 => InterlaceMode::MixedTop,
        6 => InterlaceMode::MixedBottom,
        _ => InterlaceMode::Unknown,
    }
}

fn extension_body<F>(fill: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut IoStream) -> Result<()>,
{
    let mut io = gavf_io::mem::write();
    fill(&mut io)?;
    io.take_buffer()
        .map(gavf_value::Buffer::into_vec)
        .ok_or_else(|| Error::Parse("memory sink lost its buffer".into()))
}

fn write_extension(io: &mut IoStream, key: u32, body: &[u8]) -> Result<()> {
    io.write_u32v(key)?;
    io.write_u32v(body.len() as u32)?;
    io.write_data(body)?;
    Ok(())
}

/// Write one packet frame. `default_duration` suppresses the duration
/// extension for streams with constant packet durations.
pub fn write_packet(io: &mut IoStream, p: &Packet, default_duration: i64) -> Result<()> {
    struct Ext {
        key: u32,
        body: Vec<u8>,
    }
    let mut extensions: Vec<Ext> = Vec::new();

    if p.duration > 0 && p.duration != default_duration {
        extensions.push(Ext {
            key: EXT_DURATION,
            body: extension_body(|io| io.write_i64v(p.duration).map_err(Error::from))?,
        });
    }
    if p.header_size != 0 {
        extensions.push(Ext {
            key: EXT_HEADER_SIZE,
            body: extension_body(|io| io.write_u32v(p.header_size).map_err(Error::from))?,
        });
    }
    if p.sequence_end_pos != 0 {
        extensions.push(Ext {
            key: EXT_SEQ_END,
            body: extension_body(|io| io.write_u32v(p.sequence_end_pos).map_err(Error::from))?,
        });
    }
    if p.field2_offset != 0 {
        extensions.push(Ext {
            key: EXT_FIELD2,
            body: extension_body(|io| io.write_u32v(p.field2_offset).map_err(Error::from))?,
        });
    }
    if let Some(tc) = p.timecode {
        extensions.push(Ext {
            key: EXT_TIMECODE,
            body: extension_body(|io| io.write_u64_be(tc).map_err(Error::from))?,
        });
    }
    if !matches!(p.interlace_mode, InterlaceMode::Unknown) {
        extensions.push(Ext {
            key: EXT_INTERLACE,
            body: extension_body(|io| {
                io.write_u32v(interlace_to_wire(p.interlace_mode))
                    .map_err(Error::from)
            })?,
        });
    }
    if p.src_rect.w != 0 && p.src_rect.h != 0 {
        let rect = p.src_rect;
        extensions.push(Ext {
            key: EXT_SRC_RECT,
            body: extension_body(|io| {
                io.write_i32v(rect.x)?;
                io.write_i32v(rect.y)?;
                io.write_i32v(rect.w)?;
                io.write_i32v(rect.h)?;
                Ok(())
            })?,
        });
    }
    if p.dst_x != 0 || p.dst_y != 0 {
        extensions.push(Ext {
            key: EXT_DST_COORDS,
            body: extension_body(|io| {
                io.write_i32v(p.dst_x)?;
                io.write_i32v(p.dst_y)?;
                Ok(())
            })?,
        });
    }
    if let Some(fds) = p.fds() {
        if !io.flags().contains(IoFlags::UNIX_SOCKET) {
            return Err(Error::Unsupported(
                "file descriptors can only be passed over unix sockets",
            ));
        }
        let count = fds.len() as u32;
        extensions.push(Ext {
            key: EXT_FDS,
            body: extension_body(|io| io.write_u32v(count).map_err(Error::from))?,
        });
    }

    let mut flags = p.flags;
    flags.set(PacketFlags::EXT, !extensions.is_empty());

    io.write_u8(PACKET_MARKER)?;
    io.write_i32v(p.id)?;
    io.write_i64v(p.pts)?;
    io.write_u32v(flags.bits())?;

    if !extensions.is_empty() {
        io.write_u32v(extensions.len() as u32)?;
        for ext in &extensions {
            write_extension(io, ext.key, &ext.body)?;
        }
    }

    io.write_u32v(p.buf.len() as u32)?;
    io.write_data(p.buf.as_slice())?;
    Ok(())
}

/// Read a packet frame header (everything up to the payload).
///
/// Returns the payload length; the stream is positioned at the payload.
/// The extension bit is cleared from the returned flags, matching the
/// in-memory convention.
pub fn read_packet_header(io: &mut IoStream, p: &mut Packet) -> Result<usize> {
    p.reset();

    let marker = io.read_u8()?;
    if marker != PACKET_MARKER {
        return Err(Error::Parse(format!(
            "bad packet marker 0x{marker:02x}"
        )));
    }
    p.id = io.read_i32v()?;
    p.pts = io.read_i64v()?;
    let mut flags = PacketFlags::from_bits_retain(io.read_u32v()?);

    let mut fd_count = 0u32;
    if flags.contains(PacketFlags::EXT) {
        let num_extensions = io.read_u32v()?;
        for _ in 0..num_extensions {
            let key = io.read_u32v()?;
            let len = io.read_u32v()? as i64;
            match key {
                EXT_DURATION => p.duration = io.read_i64v()?,
                EXT_HEADER_SIZE => p.header_size = io.read_u32v()?,
                EXT_SEQ_END => p.sequence_end_pos = io.read_u32v()?,
                EXT_TIMECODE => p.timecode = Some(io.read_u64_be()?),
                EXT_SRC_RECT => {
                    p.src_rect = Rectangle {
                        x: io.read_i32v()?,
                        y: io.read_i32v()?,
                        w: io.read_i32v()?,
                        h: io.read_i32v()?,
                    };
                }
                EXT_DST_COORDS => {
                    p.dst_x = io.read_i32v()?;
                    p.dst_y = io.read_i32v()?;
                }
                EXT_FIELD2 => p.field2_offset = io.read_u32v()?,
                EXT_INTERLACE => p.interlace_mode = interlace_from_wire(io.read_u32v()?),
                EXT_FDS => fd_count = io.read_u32v()?,
                _ => {
                    // Unknown extension: skip its payload.
                    io.skip(len)?;
                }
            }
        }
    }
    flags.remove(PacketFlags::EXT);
    p.flags = flags;

    if fd_count > 0 {
        if !io.flags().contains(IoFlags::UNIX_SOCKET) {
            return Err(Error::Unsupported(
                "file descriptors can only be passed over unix sockets",
            ));
        }
        p.add_extradata(Extradata::Fds(vec![-1; fd_count as usize]));
    }

    Ok(io.read_u32v()? as usize)
}

/// Read the payload announced by [`read_packet_header`].
pub fn read_packet_payload(io: &mut IoStream, p: &mut Packet, len: usize) -> Result<()> {
    p.alloc(len)?;
    let mut data = vec![0u8; len];
    io.read_exact(&mut data)?;
    p.set_data(&data)?;
    Ok(())
}

/// Skip the payload announced by [`read_packet_header`].
pub fn skip_packet_payload(io: &mut IoStream, len: usize) -> Result<()> {
    io.skip(len as i64)?;
    Ok(())
}

/// Read one whole packet frame.
pub fn read_packet(io: &mut IoStream, p: &mut Packet) -> Result<()> {
    let len = read_packet_header(io, p)?;
    read_packet_payload(io, p, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::FrameType;
    use crate::time::TIME_UNDEFINED;

    fn round_trip(p: &Packet, default_duration: i64) -> Packet {
        let mut io = gavf_io::mem::write();
        write_packet(&mut io, p, default_duration).unwrap();
        let buf = io.take_buffer().unwrap();
        let mut io = gavf_io::mem::read(buf.into_vec());
        let mut back = Packet::new();
        read_packet(&mut io, &mut back).unwrap();
        back
    }

    #[test]
    fn plain_packet_round_trips() {
        let mut p = Packet::new();
        p.id = 1;
        p.pts = 1024;
        p.duration = 1024;
        p.flags = PacketFlags::KEYFRAME;
        p.set_data(&[9; 100]).unwrap();

        let back = round_trip(&p, 0);
        assert_eq!(back.id, 1);
        assert_eq!(back.pts, 1024);
        assert_eq!(back.duration, 1024);
        assert_eq!(back.flags, PacketFlags::KEYFRAME);
        assert_eq!(back.data(), &[9; 100][..]);
    }

    #[test]
    fn default_duration_suppresses_extension() {
        let mut p = Packet::new();
        p.id = 0;
        p.pts = 5;
        p.duration = 1;
        p.set_data(&[1]).unwrap();

        let mut io = gavf_io::mem::write();
        write_packet(&mut io, &p, 1).unwrap();
        let with_default = io.take_buffer().unwrap().len();

        let mut io = gavf_io::mem::write();
        write_packet(&mut io, &p, 0).unwrap();
        let without_default = io.take_buffer().unwrap().len();
        assert!(with_default < without_default);

        // The duration is simply absent on the wire, left for the reader
        // to fill from the stream's default.
        let back = round_trip(&p, 1);
        assert_eq!(back.duration, 0);
    }

    #[test]
    fn full_extension_set_round_trips() {
        let mut p = Packet::new();
        p.id = 3;
        p.pts = -99;
        p.duration = 7;
        p.flags = PacketFlags::KEYFRAME.with_frame_type(FrameType::I);
        p.header_size = 12;
        p.sequence_end_pos = 40;
        p.field2_offset = 20;
        p.timecode = Some(0x0102_0304_0506_0708);
        p.interlace_mode = InterlaceMode::TopFirst;
        p.src_rect = Rectangle { x: 2, y: 4, w: 320, h: 240 };
        p.dst_x = -8;
        p.dst_y = 16;
        p.set_data(&[0xab; 41]).unwrap();

        let back = round_trip(&p, 0);
        assert_eq!(back, p);
    }

    #[test]
    fn negative_pts_and_ids() {
        let mut p = Packet::new();
        p.id = -2;
        p.pts = TIME_UNDEFINED;
        p.set_data(b"msg").unwrap();
        let back = round_trip(&p, 0);
        assert_eq!(back.id, -2);
        assert_eq!(back.pts, TIME_UNDEFINED);
    }

    #[test]
    fn fds_refused_off_unix_sockets() {
        let mut p = Packet::new();
        p.id = 0;
        p.add_extradata(Extradata::Fds(vec![5, 6]));
        let mut io = gavf_io::mem::write();
        assert!(matches!(
            write_packet(&mut io, &p, 0),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn bad_marker_is_a_parse_error() {
        let mut io = gavf_io::mem::read(vec![b'Q', 0, 0, 0]);
        let mut p = Packet::new();
        assert!(matches!(
            read_packet(&mut io, &mut p),
            Err(Error::Parse(_))
        ));
    }
}
