//! Video format descriptor.

use crate::Dictionary;

/// Pixel layout of uncompressed video, identified by short codes on the
/// wire (`yuv-420-p`, `rgb-24`, ...). Conversion kernels live elsewhere;
/// this type only describes layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Unknown,
    Gray8,
    Gray16,
    Rgb15,
    Rgb16,
    Rgb24,
    Bgr24,
    Rgb32,
    Bgr32,
    Rgba32,
    Rgb48,
    Rgba64,
    RgbFloat,
    RgbaFloat,
    Yuy2,
    Uyvy,
    Yuva32,
    Yuv420P,
    Yuv410P,
    Yuv411P,
    Yuv422P,
    Yuv422P16,
    Yuv444P,
    Yuv444P16,
    Yuvj420P,
    Yuvj422P,
    Yuvj444P,
}

impl PixelFormat {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Gray8 => "gray-8",
            Self::Gray16 => "gray-16",
            Self::Rgb15 => "rgb-15",
            Self::Rgb16 => "rgb-16",
            Self::Rgb24 => "rgb-24",
            Self::Bgr24 => "bgr-24",
            Self::Rgb32 => "rgb-32",
            Self::Bgr32 => "bgr-32",
            Self::Rgba32 => "rgba-32",
            Self::Rgb48 => "rgb-48",
            Self::Rgba64 => "rgba-64",
            Self::RgbFloat => "rgb-float",
            Self::RgbaFloat => "rgba-float",
            Self::Yuy2 => "yuy2",
            Self::Uyvy => "uyvy",
            Self::Yuva32 => "yuva-32",
            Self::Yuv420P => "yuv-420-p",
            Self::Yuv410P => "yuv-410-p",
            Self::Yuv411P => "yuv-411-p",
            Self::Yuv422P => "yuv-422-p",
            Self::Yuv422P16 => "yuv-422-p-16",
            Self::Yuv444P => "yuv-444-p",
            Self::Yuv444P16 => "yuv-444-p-16",
            Self::Yuvj420P => "yuvj-420-p",
            Self::Yuvj422P => "yuvj-422-p",
            Self::Yuvj444P => "yuvj-444-p",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "unknown" => Self::Unknown,
            "gray-8" => Self::Gray8,
            "gray-16" => Self::Gray16,
            "rgb-15" => Self::Rgb15,
            "rgb-16" => Self::Rgb16,
            "rgb-24" => Self::Rgb24,
            "bgr-24" => Self::Bgr24,
            "rgb-32" => Self::Rgb32,
            "bgr-32" => Self::Bgr32,
            "rgba-32" => Self::Rgba32,
            "rgb-48" => Self::Rgb48,
            "rgba-64" => Self::Rgba64,
            "rgb-float" => Self::RgbFloat,
            "rgba-float" => Self::RgbaFloat,
            "yuy2" => Self::Yuy2,
            "uyvy" => Self::Uyvy,
            "yuva-32" => Self::Yuva32,
            "yuv-420-p" => Self::Yuv420P,
            "yuv-410-p" => Self::Yuv410P,
            "yuv-411-p" => Self::Yuv411P,
            "yuv-422-p" => Self::Yuv422P,
            "yuv-422-p-16" => Self::Yuv422P16,
            "yuv-444-p" => Self::Yuv444P,
            "yuv-444-p-16" => Self::Yuv444P16,
            "yuvj-420-p" => Self::Yuvj420P,
            "yuvj-422-p" => Self::Yuvj422P,
            "yuvj-444-p" => Self::Yuvj444P,
            _ => return None,
        })
    }

    /// Number of image planes.
    pub fn num_planes(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::Yuv420P
            | Self::Yuv410P
            | Self::Yuv411P
            | Self::Yuv422P
            | Self::Yuv422P16
            | Self::Yuv444P
            | Self::Yuv444P16
            | Self::Yuvj420P
            | Self::Yuvj422P
            | Self::Yuvj444P => 3,
            _ => 1,
        }
    }

    /// Chroma subsampling factors `(sub_h, sub_v)`.
    pub fn chroma_sub(self) -> (u32, u32) {
        match self {
            Self::Yuv420P | Self::Yuvj420P => (2, 2),
            Self::Yuv410P => (4, 4),
            Self::Yuv411P => (4, 1),
            Self::Yuv422P | Self::Yuv422P16 | Self::Yuvj422P => (2, 1),
            _ => (1, 1),
        }
    }

    /// Bytes per pixel of the luma/packed plane.
    pub fn bytes_per_component(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::Gray8
            | Self::Yuv420P
            | Self::Yuv410P
            | Self::Yuv411P
            | Self::Yuv422P
            | Self::Yuv444P
            | Self::Yuvj420P
            | Self::Yuvj422P
            | Self::Yuvj444P => 1,
            Self::Gray16 | Self::Rgb15 | Self::Rgb16 | Self::Yuv422P16 | Self::Yuv444P16 => 2,
            Self::Rgb24 | Self::Bgr24 => 3,
            Self::Rgb32 | Self::Bgr32 | Self::Rgba32 | Self::Yuva32 => 4,
            Self::Rgb48 => 6,
            Self::Rgba64 => 8,
            Self::RgbFloat => 12,
            Self::RgbaFloat => 16,
            Self::Yuy2 | Self::Uyvy => 2,
        }
    }

    fn is_packed_rgb_or_gray(self) -> bool {
        !matches!(
            self,
            Self::Unknown
                | Self::Yuv420P
                | Self::Yuv410P
                | Self::Yuv411P
                | Self::Yuv422P
                | Self::Yuv422P16
                | Self::Yuv444P
                | Self::Yuv444P16
                | Self::Yuvj420P
                | Self::Yuvj422P
                | Self::Yuvj444P
        )
    }
}

/// Interlacing of the frames in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterlaceMode {
    #[default]
    Unknown,
    /// Progressive.
    None,
    TopFirst,
    BottomFirst,
    Mixed,
    MixedTop,
    MixedBottom,
}

impl InterlaceMode {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::None => "p",
            Self::TopFirst => "t",
            Self::BottomFirst => "b",
            Self::Mixed => "mixed",
            Self::MixedTop => "t+p",
            Self::MixedBottom => "b+p",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "unknown" => Self::Unknown,
            "p" => Self::None,
            "t" => Self::TopFirst,
            "b" => Self::BottomFirst,
            "mixed" => Self::Mixed,
            "t+p" => Self::MixedTop,
            "b+p" => Self::MixedBottom,
            _ => return None,
        })
    }
}

/// How frame timestamps relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramerateMode {
    #[default]
    Unknown,
    Constant,
    Variable,
    Still,
}

impl FramerateMode {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Constant => "constant",
            Self::Variable => "vfr",
            Self::Still => "still",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "unknown" => Self::Unknown,
            "constant" => Self::Constant,
            "vfr" => Self::Variable,
            "still" => Self::Still,
            _ => return None,
        })
    }
}

/// Position of the chroma samples relative to the luma grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromaPlacement {
    /// MPEG-1/JPEG style (centered).
    #[default]
    Mpeg1,
    Mpeg2,
    DvPal,
}

impl ChromaPlacement {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Mpeg1 => "mpeg1",
            Self::Mpeg2 => "mpeg2",
            Self::DvPal => "dvpal",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "mpeg1" => Self::Mpeg1,
            "mpeg2" => Self::Mpeg2,
            "dvpal" => Self::DvPal,
            _ => return None,
        })
    }
}

/// Timecode track description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimecodeFormat {
    /// Integer framerate for timecodes (frames per second, rounded up).
    pub int_framerate: i32,
    /// Flags (drop frame etc.).
    pub flags: i32,
}

/// Format of an uncompressed video stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoFormat {
    /// Displayed width in pixels.
    pub image_width: i32,
    /// Displayed height in pixels.
    pub image_height: i32,
    /// Allocated width in pixels (padded to subsampling multiples).
    pub frame_width: i32,
    /// Allocated height in pixels.
    pub frame_height: i32,
    /// Numerator of the pixel aspect ratio.
    pub pixel_width: i32,
    /// Denominator of the pixel aspect ratio.
    pub pixel_height: i32,
    /// Duration of one frame in timescale units (constant framerate only).
    pub frame_duration: i32,
    /// Timestamp ticks per second.
    pub timescale: i32,
    pub pixelformat: PixelFormat,
    pub interlace_mode: InterlaceMode,
    pub framerate_mode: FramerateMode,
    pub chroma_placement: ChromaPlacement,
    pub timecode_format: Option<TimecodeFormat>,
}

impl VideoFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frame size from the image size, padding width and height to
    /// multiples of the chroma subsampling (at least `pad_h`/`pad_v`).
    pub fn set_frame_size(&mut self, pad_h: i32, pad_v: i32) {
        let (sub_h, sub_v) = self.pixelformat.chroma_sub();
        let pad_h = pad_h.max(sub_h as i32);
        let pad_v = pad_v.max(sub_v as i32);
        self.frame_width = (self.image_width + pad_h - 1) / pad_h * pad_h;
        self.frame_height = (self.image_height + pad_v - 1) / pad_v * pad_v;
    }

    /// Bytes needed to store one frame.
    pub fn image_size(&self) -> usize {
        let w = self.frame_width.max(self.image_width) as usize;
        let h = self.frame_height.max(self.image_height) as usize;
        let bpc = self.pixelformat.bytes_per_component();
        if self.pixelformat.is_packed_rgb_or_gray() {
            return w * h * bpc;
        }
        let (sub_h, sub_v) = self.pixelformat.chroma_sub();
        let luma = w * h * bpc;
        let chroma = (w / sub_h as usize) * (h / sub_v as usize) * bpc;
        luma + 2 * chroma
    }

    /// The format of a single field: half height for interlaced content.
    pub fn field_format(&self) -> VideoFormat {
        let mut ret = self.clone();
        if !matches!(self.interlace_mode, InterlaceMode::Unknown | InterlaceMode::None) {
            ret.image_height /= 2;
            ret.frame_height /= 2;
        }
        ret
    }

    /// Chroma sample offset relative to the luma grid, in luma pixels.
    ///
    /// `field` is 0 for top, 1 for bottom; `plane` 0 is luma. Only 2x2
    /// subsampled formats have nonzero offsets.
    pub fn chroma_offset(&self, field: usize, plane: usize) -> (f32, f32) {
        if plane == 0 {
            return (0.0, 0.0);
        }
        if self.pixelformat.chroma_sub() != (2, 2) {
            return (0.0, 0.0);
        }
        match self.chroma_placement {
            ChromaPlacement::Mpeg1 => (0.5, 0.5),
            ChromaPlacement::Mpeg2 => {
                if matches!(self.interlace_mode, InterlaceMode::None) {
                    (0.0, 0.5)
                } else if field == 0 {
                    (0.0, 0.25)
                } else {
                    (0.0, 0.75)
                }
            }
            ChromaPlacement::DvPal => {
                if plane == 1 {
                    (0.0, 1.0)
                } else {
                    (0.0, 0.0)
                }
            }
        }
    }

    /// Serialize into the stable dictionary form.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set_int("image_width", self.image_width);
        dict.set_int("image_height", self.image_height);
        dict.set_int("frame_width", self.frame_width);
        dict.set_int("frame_height", self.frame_height);
        dict.set_int("pixel_width", self.pixel_width);
        dict.set_int("pixel_height", self.pixel_height);
        dict.set_int("frame_duration", self.frame_duration);
        dict.set_int("timescale", self.timescale);
        dict.set_string("pixelformat", self.pixelformat.short_name());
        dict.set_string("interlace_mode", self.interlace_mode.short_name());
        dict.set_string("framerate_mode", self.framerate_mode.short_name());
        dict.set_string("chroma_placement", self.chroma_placement.short_name());
        if let Some(tc) = self.timecode_format {
            let mut tc_dict = Dictionary::new();
            tc_dict.set_int("int_framerate", tc.int_framerate);
            if tc.flags != 0 {
                tc_dict.set_int("flags", tc.flags);
            }
            dict.set_dictionary("timecode_format", tc_dict);
        }
        dict
    }

    /// Rebuild from the dictionary form. Unknown enum codes fail.
    pub fn from_dictionary(dict: &Dictionary) -> Option<Self> {
        let mut fmt = Self::new();
        fmt.image_width = dict.get_int("image_width").unwrap_or(0);
        fmt.image_height = dict.get_int("image_height").unwrap_or(0);
        fmt.frame_width = dict.get_int("frame_width").unwrap_or(0);
        fmt.frame_height = dict.get_int("frame_height").unwrap_or(0);
        fmt.pixel_width = dict.get_int("pixel_width").unwrap_or(0);
        fmt.pixel_height = dict.get_int("pixel_height").unwrap_or(0);
        fmt.frame_duration = dict.get_int("frame_duration").unwrap_or(0);
        fmt.timescale = dict.get_int("timescale").unwrap_or(0);
        if let Some(s) = dict.get_string("pixelformat") {
            fmt.pixelformat = PixelFormat::from_short_name(s)?;
        }
        if let Some(s) = dict.get_string("interlace_mode") {
            fmt.interlace_mode = InterlaceMode::from_short_name(s)?;
        }
        if let Some(s) = dict.get_string("framerate_mode") {
            fmt.framerate_mode = FramerateMode::from_short_name(s)?;
        }
        if let Some(s) = dict.get_string("chroma_placement") {
            fmt.chroma_placement = ChromaPlacement::from_short_name(s)?;
        }
        if let Some(tc) = dict.get_dictionary("timecode_format") {
            fmt.timecode_format = Some(TimecodeFormat {
                int_framerate: tc.get_int("int_framerate")?,
                flags: tc.get_int("flags").unwrap_or(0),
            });
        }
        Some(fmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qvga() -> VideoFormat {
        let mut fmt = VideoFormat {
            image_width: 320,
            image_height: 240,
            pixel_width: 1,
            pixel_height: 1,
            timescale: 25,
            frame_duration: 1,
            pixelformat: PixelFormat::Yuv420P,
            framerate_mode: FramerateMode::Constant,
            interlace_mode: InterlaceMode::None,
            ..VideoFormat::default()
        };
        fmt.set_frame_size(0, 0);
        fmt
    }

    #[test]
    fn dictionary_round_trip() {
        let mut fmt = qvga();
        fmt.timecode_format = Some(TimecodeFormat {
            int_framerate: 25,
            flags: 0,
        });
        let dict = fmt.to_dictionary();
        assert_eq!(VideoFormat::from_dictionary(&dict), Some(fmt));
    }

    #[test]
    fn frame_size_pads_to_subsampling() {
        let mut fmt = VideoFormat {
            image_width: 321,
            image_height: 241,
            pixelformat: PixelFormat::Yuv420P,
            ..VideoFormat::default()
        };
        fmt.set_frame_size(0, 0);
        assert_eq!(fmt.frame_width, 322);
        assert_eq!(fmt.frame_height, 242);
    }

    #[test]
    fn image_size_accounts_for_planes() {
        let fmt = qvga();
        // 320x240 luma plus two quarter-size chroma planes.
        assert_eq!(fmt.image_size(), 320 * 240 * 3 / 2);
    }

    #[test]
    fn chroma_offsets() {
        let mut fmt = qvga();
        assert_eq!(fmt.chroma_offset(0, 0), (0.0, 0.0));
        assert_eq!(fmt.chroma_offset(0, 1), (0.5, 0.5));
        fmt.chroma_placement = ChromaPlacement::Mpeg2;
        assert_eq!(fmt.chroma_offset(0, 1), (0.0, 0.5));
        fmt.pixelformat = PixelFormat::Yuv444P;
        assert_eq!(fmt.chroma_offset(0, 1), (0.0, 0.0));
    }

    #[test]
    fn field_format_halves_interlaced() {
        let mut fmt = qvga();
        fmt.interlace_mode = InterlaceMode::TopFirst;
        let field = fmt.field_format();
        assert_eq!(field.image_height, 120);

        fmt.interlace_mode = InterlaceMode::None;
        assert_eq!(fmt.field_format().image_height, 240);
    }
}
