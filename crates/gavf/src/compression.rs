//! Codec identities and per-stream compression info.
//!
//! Codecs are never implemented here; compressed packets pass through
//! opaquely. This module only names them and carries their out-of-band
//! setup data (global headers, bitrate hints, palettes).

use bitflags::bitflags;
use gavf_value::{Buffer, Dictionary};

use crate::{Error, Result};

/// Bitrate sentinel: variable bitrate stream.
pub const BITRATE_VBR: i32 = -1;
/// Bitrate sentinel: losslessly compressed stream.
pub const BITRATE_LOSSLESS: i32 = -2;

/// Identity of a codec. The numeric values are stable and appear in
/// serialized compression info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum CodecId {
    #[default]
    None = 0,
    /* Audio */
    Alaw = 1,
    Ulaw = 2,
    Mp2 = 3,
    Mp3 = 4,
    Ac3 = 5,
    Aac = 6,
    Vorbis = 7,
    Flac = 8,
    Opus = 9,
    Speex = 10,
    Dts = 11,
    /* Video */
    Jpeg = 0x10000,
    Png = 0x10001,
    Tiff = 0x10002,
    Tga = 0x10003,
    Mpeg1 = 0x10004,
    Mpeg2 = 0x10005,
    Mpeg4Asp = 0x10006,
    H264 = 0x10007,
    Theora = 0x10008,
    Dirac = 0x10009,
    Dv = 0x1000a,
    Vp8 = 0x1000b,
    Div3 = 0x1000c,
    /* Subtitle */
    DvdSub = 0x20000,
    /// Identified by the compression tag instead.
    Extended = 0xffff_ffff,
}

struct CodecEntry {
    id: CodecId,
    extension: Option<&'static str>,
    short_name: &'static str,
    long_name: &'static str,
    mimetype: Option<&'static str>,
    separate_files: bool,
    needs_pixelformat: bool,
    constant_frame_samples: bool,
    sample_size: u32,
}

const fn entry(
    id: CodecId,
    extension: Option<&'static str>,
    short_name: &'static str,
    long_name: &'static str,
    mimetype: Option<&'static str>,
) -> CodecEntry {
    CodecEntry {
        id,
        extension,
        short_name,
        long_name,
        mimetype,
        separate_files: false,
        needs_pixelformat: false,
        constant_frame_samples: false,
        sample_size: 0,
    }
}

const fn cfs(mut e: CodecEntry) -> CodecEntry {
    e.constant_frame_samples = true;
    e
}

const fn image(mut e: CodecEntry) -> CodecEntry {
    e.separate_files = true;
    e.needs_pixelformat = true;
    e
}

const fn pixfmt(mut e: CodecEntry) -> CodecEntry {
    e.needs_pixelformat = true;
    e
}

const fn sampled(mut e: CodecEntry, size: u32) -> CodecEntry {
    e.sample_size = size;
    e
}

const CODECS: &[CodecEntry] = &[
    sampled(entry(CodecId::Alaw, None, "alaw", "alaw", Some("audio/x-alaw")), 1),
    sampled(entry(CodecId::Ulaw, None, "ulaw", "ulaw", Some("audio/x-mulaw")), 1),
    cfs(entry(CodecId::Mp2, Some("mp2"), "mp2", "MPEG layer 2", Some("audio/mpeg"))),
    cfs(entry(CodecId::Mp3, Some("mp3"), "mp3", "MPEG layer 3", Some("audio/mpeg"))),
    cfs(entry(CodecId::Ac3, Some("ac3"), "ac3", "AC3", Some("audio/x-ac3"))),
    cfs(entry(CodecId::Aac, None, "aac", "AAC", None)),
    entry(CodecId::Vorbis, None, "vorbis", "Vorbis", Some("audio/x-vorbis")),
    entry(CodecId::Flac, None, "flac", "Flac", Some("audio/x-flac")),
    entry(CodecId::Opus, None, "opus", "Opus", Some("audio/opus")),
    cfs(entry(CodecId::Speex, None, "speex", "Speex", Some("audio/x-speex"))),
    entry(CodecId::Dts, None, "dts", "DTS", None),
    image(entry(CodecId::Jpeg, Some("jpg"), "jpeg", "JPEG image", Some("image/jpeg"))),
    image(entry(CodecId::Png, Some("png"), "png", "PNG image", Some("image/png"))),
    image(entry(CodecId::Tiff, Some("tif"), "tiff", "TIFF image", Some("image/tiff"))),
    image(entry(CodecId::Tga, Some("tga"), "tga", "TGA image", Some("image/x-tga"))),
    entry(CodecId::Mpeg1, Some("mpv"), "mpeg1", "MPEG-1", Some("video/mpeg")),
    pixfmt(entry(CodecId::Mpeg2, Some("mpv"), "mpeg2", "MPEG-2", Some("video/mpeg"))),
    entry(CodecId::Mpeg4Asp, Some("m4v"), "mpeg4", "MPEG-4", None),
    entry(CodecId::H264, Some("h264"), "h264", "H.264", None),
    entry(CodecId::Theora, None, "theora", "Theora", None),
    entry(CodecId::Dirac, None, "dirac", "Dirac", Some("video/x-dirac")),
    pixfmt(entry(CodecId::Dv, Some("dv"), "dv", "DV", None)),
    entry(CodecId::Vp8, None, "vp8", "VP8", Some("video/x-vp8")),
    entry(CodecId::Div3, None, "divx3", "DivX 3", None),
    entry(CodecId::DvdSub, None, "dvdsub", "DVD subtitles", None),
];

fn lookup(id: CodecId) -> Option<&'static CodecEntry> {
    CODECS.iter().find(|e| e.id == id)
}

impl CodecId {
    pub fn short_name(self) -> Option<&'static str> {
        lookup(self).map(|e| e.short_name)
    }

    pub fn long_name(self) -> Option<&'static str> {
        lookup(self).map(|e| e.long_name)
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        CODECS.iter().find(|e| e.short_name == name).map(|e| e.id)
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        CODECS.iter().find(|e| e.id as u32 == tag).map(|e| e.id)
    }

    /// File extension and whether frames live in separate files
    /// (image codecs).
    pub fn extension(self) -> Option<(&'static str, bool)> {
        lookup(self).and_then(|e| e.extension.map(|ext| (ext, e.separate_files)))
    }

    /// Bytes per sample for sample-oriented audio codecs, 0 otherwise.
    pub fn sample_size(self) -> u32 {
        lookup(self).map_or(0, |e| e.sample_size)
    }

    /// True if the decoder needs the pixelformat communicated out of band.
    pub fn needs_pixelformat(self) -> bool {
        lookup(self).is_some_and(|e| e.needs_pixelformat)
    }

    /// True if every packet decodes to the same number of samples.
    pub fn constant_frame_samples(self) -> bool {
        lookup(self).is_some_and(|e| e.constant_frame_samples)
    }
}

bitflags! {
    /// Properties of a compressed stream.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CompressionFlags: u32 {
        /// P-frames are present.
        const HAS_P_FRAMES = 1 << 0;
        /// B-frames are present; PTS and DTS differ.
        const HAS_B_FRAMES = 1 << 1;
        /// Packets may carry field pictures.
        const HAS_FIELD_PICTURES = 1 << 2;
        /// Spectral band replication: output samplerate doubles.
        const SBR = 1 << 3;
        /// Samples are big-endian.
        const BIG_ENDIAN = 1 << 4;
    }
}

/// Per-stream codec identity and setup data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompressionInfo {
    pub id: CodecId,
    pub flags: CompressionFlags,
    /// Codec global header (sequence headers, Xiph header packs, ...).
    pub global_header: Buffer,
    /// Bits per second, or [`BITRATE_VBR`] / [`BITRATE_LOSSLESS`].
    pub bitrate: i32,
    /// Palette size in entries for palettized subtitle codecs.
    pub palette_size: i32,
    /// Samples the decoder discards at the start of the stream.
    pub pre_skip: i32,
    pub max_packet_size: i32,
    /// VBV/VBR buffer size in bytes.
    pub video_buffer_size: i32,
    /// Compression tag (fourcc / wav id) for [`CodecId::Extended`].
    pub tag: u32,
    pub block_align: i32,
}

/// Padding appended to global headers, matching packet payload padding.
const HEADER_PADDING: usize = 32;

impl CompressionInfo {
    pub fn new(id: CodecId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Replace the global header.
    pub fn set_global_header(&mut self, data: &[u8]) -> Result<()> {
        self.global_header.reset();
        self.append_global_header(data)
    }

    /// Append bytes to the global header, keeping the zero padding.
    pub fn append_global_header(&mut self, data: &[u8]) -> Result<()> {
        self.global_header
            .append_pad(data, HEADER_PADDING)
            .map_err(gavf_io::Error::from)?;
        Ok(())
    }

    /// Mimetype of this stream, preferring the codec's own.
    pub fn mimetype(&self) -> Option<&'static str> {
        lookup(self.id).and_then(|e| e.mimetype)
    }

    /// Append a Xiph-style sub-header: `[u32be length][bytes]` onto the
    /// global header.
    pub fn append_xiph_header(&mut self, header: &[u8]) -> Result<()> {
        let len = (header.len() as u32).to_be_bytes();
        self.global_header
            .append_pad(&len, HEADER_PADDING)
            .map_err(gavf_io::Error::from)?;
        self.append_global_header(header)
    }

    /// Walk the length-prefixed Xiph sub-header list and return entry
    /// `idx`.
    pub fn extract_xiph_header(&self, idx: usize) -> Option<&[u8]> {
        let data = self.global_header.as_slice();
        let mut pos = 0usize;
        let mut current = 0usize;
        while pos + 4 <= data.len() {
            let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
                as usize;
            pos += 4;
            if pos + len > data.len() {
                return None;
            }
            if current == idx {
                return Some(&data[pos..pos + len]);
            }
            pos += len;
            current += 1;
        }
        None
    }

    /// Serialize into the stream dictionary form.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        if let Some(name) = self.id.short_name() {
            dict.set_string("codec", name);
        }
        if self.id != CodecId::None {
            dict.set_int("codec_id", self.id as u32 as i32);
        }
        if !self.flags.is_empty() {
            dict.set_int("flags", self.flags.bits() as i32);
        }
        if !self.global_header.is_empty() {
            dict.set_binary("global_header", self.global_header.as_slice());
        }
        if self.bitrate != 0 {
            dict.set_int("bitrate", self.bitrate);
        }
        if self.palette_size != 0 {
            dict.set_int("palette_size", self.palette_size);
        }
        if self.pre_skip != 0 {
            dict.set_int("pre_skip", self.pre_skip);
        }
        if self.max_packet_size != 0 {
            dict.set_int("max_packet_size", self.max_packet_size);
        }
        if self.video_buffer_size != 0 {
            dict.set_int("video_buffer_size", self.video_buffer_size);
        }
        if self.tag != 0 {
            dict.set_int("tag", self.tag as i32);
        }
        if self.block_align != 0 {
            dict.set_int("block_align", self.block_align);
        }
        dict
    }

    /// Rebuild from the stream dictionary form.
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self> {
        let mut info = Self::default();
        if let Some(tag) = dict.get_int("codec_id") {
            info.id = match tag as u32 {
                0 => CodecId::None,
                0xffff_ffff => CodecId::Extended,
                tag => CodecId::from_tag(tag)
                    .or_else(|| dict.get_string("codec").and_then(CodecId::from_short_name))
                    .ok_or_else(|| Error::Parse(format!("unknown codec id {tag}")))?,
            };
        } else if let Some(name) = dict.get_string("codec") {
            info.id = CodecId::from_short_name(name)
                .ok_or_else(|| Error::Parse(format!("unknown codec {name}")))?;
        }
        info.flags =
            CompressionFlags::from_bits_truncate(dict.get_int("flags").unwrap_or(0) as u32);
        if let Some(hdr) = dict.get_binary("global_header") {
            info.set_global_header(hdr.as_slice())?;
        }
        info.bitrate = dict.get_int("bitrate").unwrap_or(0);
        info.palette_size = dict.get_int("palette_size").unwrap_or(0);
        info.pre_skip = dict.get_int("pre_skip").unwrap_or(0);
        info.max_packet_size = dict.get_int("max_packet_size").unwrap_or(0);
        info.video_buffer_size = dict.get_int("video_buffer_size").unwrap_or(0);
        info.tag = dict.get_int("tag").unwrap_or(0) as u32;
        info.block_align = dict.get_int("block_align").unwrap_or(0);
        Ok(info)
    }

    /// Multi-line debug dump.
    pub fn dump(&self) -> String {
        let mut out = format!(
            "Compression info\n  Codec: {} [{}]\n",
            self.id.long_name().unwrap_or("(none)"),
            self.id.short_name().unwrap_or("(none)"),
        );
        match self.bitrate {
            BITRATE_VBR => out.push_str("  Bitrate: Variable\n"),
            BITRATE_LOSSLESS => out.push_str("  Bitrate: Lossless\n"),
            0 => out.push_str("  Bitrate: Unknown\n"),
            b => out.push_str(&format!("  Bitrate: {b} bps\n")),
        }
        if !self.global_header.is_empty() {
            out.push_str(&format!(
                "  Global header {} bytes: {}\n",
                self.global_header.len(),
                hex::encode(&self.global_header.as_slice()[..self.global_header.len().min(16)])
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_round_trip() {
        for id in [
            CodecId::Alaw,
            CodecId::Mp3,
            CodecId::Vorbis,
            CodecId::H264,
            CodecId::Mpeg2,
            CodecId::DvdSub,
        ] {
            let name = id.short_name().unwrap();
            assert_eq!(CodecId::from_short_name(name), Some(id));
            assert_eq!(CodecId::from_tag(id as u32), Some(id));
        }
        assert_eq!(CodecId::from_short_name("nonsense"), None);
    }

    #[test]
    fn codec_properties() {
        assert_eq!(CodecId::Alaw.sample_size(), 1);
        assert_eq!(CodecId::Mp3.sample_size(), 0);
        assert!(CodecId::Mp3.constant_frame_samples());
        assert!(!CodecId::Vorbis.constant_frame_samples());
        assert!(CodecId::Mpeg2.needs_pixelformat());
        assert!(!CodecId::Mpeg1.needs_pixelformat());
        assert_eq!(CodecId::Jpeg.extension(), Some(("jpg", true)));
        assert_eq!(CodecId::H264.extension(), Some(("h264", false)));
        assert_eq!(CodecId::Vorbis.extension(), None);
    }

    #[test]
    fn global_header_is_padded() {
        let mut info = CompressionInfo::new(CodecId::H264);
        info.set_global_header(&[1, 2, 3]).unwrap();
        assert_eq!(info.global_header.len(), 3);
        assert!(info.global_header.capacity() >= 3 + 32);
        info.append_global_header(&[4]).unwrap();
        assert_eq!(info.global_header.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn xiph_headers() {
        let mut info = CompressionInfo::new(CodecId::Vorbis);
        info.append_xiph_header(b"first").unwrap();
        info.append_xiph_header(b"second header").unwrap();
        info.append_xiph_header(b"").unwrap();
        assert_eq!(info.extract_xiph_header(0), Some(&b"first"[..]));
        assert_eq!(info.extract_xiph_header(1), Some(&b"second header"[..]));
        assert_eq!(info.extract_xiph_header(2), Some(&b""[..]));
        assert_eq!(info.extract_xiph_header(3), None);
    }

    #[test]
    fn dictionary_round_trip() {
        let mut info = CompressionInfo::new(CodecId::Opus);
        info.flags = CompressionFlags::SBR;
        info.bitrate = BITRATE_VBR;
        info.pre_skip = 312;
        info.set_global_header(b"OpusHead").unwrap();
        let dict = info.to_dictionary();
        assert_eq!(CompressionInfo::from_dictionary(&dict).unwrap(), info);
    }
}
