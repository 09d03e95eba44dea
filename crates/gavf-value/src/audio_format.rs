//! Audio format descriptor.

use crate::Dictionary;

/// Maximum number of channels a format can describe.
pub const MAX_CHANNELS: usize = 128;

/// Sample format of uncompressed audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    Unknown,
    U8,
    S8,
    U16,
    S16,
    S32,
    Float,
    Double,
}

impl SampleFormat {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::U8 => "u8",
            Self::S8 => "s8",
            Self::U16 => "u16",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "unknown" => Self::Unknown,
            "u8" => Self::U8,
            "s8" => Self::S8,
            "u16" => Self::U16,
            "s16" => Self::S16,
            "s32" => Self::S32,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        })
    }

    /// Bytes per sample.
    pub fn bytes(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::S32 | Self::Float => 4,
            Self::Double => 8,
        }
    }
}

/// How channels are laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterleaveMode {
    /// One buffer per channel.
    #[default]
    None,
    /// Channels interleaved in pairs.
    Pairs,
    /// All channels interleaved.
    All,
}

impl InterleaveMode {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pairs => "pairs",
            Self::All => "all",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "none" => Self::None,
            "pairs" => Self::Pairs,
            "all" => Self::All,
            _ => return None,
        })
    }
}

/// Speaker position of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelId {
    #[default]
    Unknown,
    FrontCenter,
    FrontLeft,
    FrontRight,
    FrontCenterLeft,
    FrontCenterRight,
    RearCenter,
    RearLeft,
    RearRight,
    SideLeft,
    SideRight,
    Lfe,
    Aux,
}

impl ChannelId {
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::FrontCenter => "fc",
            Self::FrontLeft => "fl",
            Self::FrontRight => "fr",
            Self::FrontCenterLeft => "fcl",
            Self::FrontCenterRight => "fcr",
            Self::RearCenter => "rc",
            Self::RearLeft => "rl",
            Self::RearRight => "rr",
            Self::SideLeft => "sl",
            Self::SideRight => "sr",
            Self::Lfe => "lfe",
            Self::Aux => "aux",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "unknown" => Self::Unknown,
            "fc" => Self::FrontCenter,
            "fl" => Self::FrontLeft,
            "fr" => Self::FrontRight,
            "fcl" => Self::FrontCenterLeft,
            "fcr" => Self::FrontCenterRight,
            "rc" => Self::RearCenter,
            "rl" => Self::RearLeft,
            "rr" => Self::RearRight,
            "sl" => Self::SideLeft,
            "sr" => Self::SideRight,
            "lfe" => Self::Lfe,
            "aux" => Self::Aux,
            _ => return None,
        })
    }
}

/// Format of an uncompressed audio stream.
///
/// A fixed record, not a dictionary; the dictionary form produced by
/// [`AudioFormat::to_dictionary`] is what goes on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioFormat {
    /// Samples per frame for block-based processing.
    pub samples_per_frame: i32,
    pub samplerate: i32,
    pub num_channels: i32,
    pub sample_format: SampleFormat,
    pub interleave_mode: InterleaveMode,
    /// Level of the center channel when mixing to stereo (0.0..1.0).
    pub center_level: f64,
    /// Level of the rear channels when mixing to stereo (0.0..1.0).
    pub rear_level: f64,
    /// Speaker position per channel, `num_channels` entries.
    pub channel_locations: Vec<ChannelId>,
}

impl AudioFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of front channels.
    pub fn num_front_channels(&self) -> usize {
        self.channel_locations
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    ChannelId::FrontCenter
                        | ChannelId::FrontLeft
                        | ChannelId::FrontRight
                        | ChannelId::FrontCenterLeft
                        | ChannelId::FrontCenterRight
                )
            })
            .count()
    }

    /// Number of rear channels.
    pub fn num_rear_channels(&self) -> usize {
        self.channel_locations
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    ChannelId::RearCenter | ChannelId::RearLeft | ChannelId::RearRight
                )
            })
            .count()
    }

    /// Number of side channels.
    pub fn num_side_channels(&self) -> usize {
        self.channel_locations
            .iter()
            .filter(|c| matches!(c, ChannelId::SideLeft | ChannelId::SideRight))
            .count()
    }

    /// Number of LFE channels.
    pub fn num_lfe_channels(&self) -> usize {
        self.channel_locations
            .iter()
            .filter(|c| matches!(c, ChannelId::Lfe))
            .count()
    }

    /// Index of `id` in the channel layout.
    pub fn channel_index(&self, id: ChannelId) -> Option<usize> {
        self.channel_locations.iter().position(|c| *c == id)
    }

    /// Bytes per sample.
    pub fn sample_size(&self) -> usize {
        self.sample_format.bytes()
    }

    /// Bytes needed for one frame of audio in this format.
    pub fn buffer_size(&self) -> usize {
        self.sample_size() * self.samples_per_frame as usize * self.num_channels as usize
    }

    /// Fill `channel_locations` with the default setup for `num_channels`.
    pub fn set_default_channel_setup(&mut self) {
        use ChannelId::{
            FrontCenter, FrontLeft, FrontRight, Lfe, RearLeft, RearRight, SideLeft, SideRight,
        };
        self.channel_locations = match self.num_channels {
            1 => vec![FrontCenter],
            2 => vec![FrontLeft, FrontRight],
            3 => vec![FrontLeft, FrontRight, FrontCenter],
            4 => vec![FrontLeft, FrontRight, RearLeft, RearRight],
            5 => vec![FrontLeft, FrontRight, FrontCenter, RearLeft, RearRight],
            6 => vec![FrontLeft, FrontRight, FrontCenter, Lfe, RearLeft, RearRight],
            8 => vec![
                FrontLeft, FrontRight, FrontCenter, Lfe, RearLeft, RearRight, SideLeft, SideRight,
            ],
            n if n > 0 => vec![ChannelId::Aux; n as usize],
            _ => Vec::new(),
        };
    }

    /// Pick the entry of `supported` closest to our samplerate.
    pub fn nearest_samplerate(&self, supported: &[i32]) -> Option<i32> {
        supported
            .iter()
            .copied()
            .min_by_key(|r| (i64::from(*r) - i64::from(self.samplerate)).abs())
    }

    /// Serialize into the stable dictionary form.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set_int("samples_per_frame", self.samples_per_frame);
        dict.set_int("samplerate", self.samplerate);
        dict.set_int("num_channels", self.num_channels);
        dict.set_string("sample_format", self.sample_format.short_name());
        dict.set_string("interleave_mode", self.interleave_mode.short_name());
        if self.center_level != 0.0 {
            dict.set_float("center_level", self.center_level);
        }
        if self.rear_level != 0.0 {
            dict.set_float("rear_level", self.rear_level);
        }
        if !self.channel_locations.is_empty() {
            let locations: crate::Array = self
                .channel_locations
                .iter()
                .map(|ch| crate::Value::from(ch.short_name()))
                .collect();
            dict.set_array("channel_locations", locations);
        }
        dict
    }

    /// Rebuild from the dictionary form. Unknown enum codes fail.
    pub fn from_dictionary(dict: &Dictionary) -> Option<Self> {
        let mut fmt = Self::new();
        fmt.samples_per_frame = dict.get_int("samples_per_frame").unwrap_or(0);
        fmt.samplerate = dict.get_int("samplerate").unwrap_or(0);
        fmt.num_channels = dict.get_int("num_channels").unwrap_or(0);
        if let Some(s) = dict.get_string("sample_format") {
            fmt.sample_format = SampleFormat::from_short_name(s)?;
        }
        if let Some(s) = dict.get_string("interleave_mode") {
            fmt.interleave_mode = InterleaveMode::from_short_name(s)?;
        }
        fmt.center_level = dict.get_float("center_level").unwrap_or(0.0);
        fmt.rear_level = dict.get_float("rear_level").unwrap_or(0.0);
        for i in 0..dict.num_items("channel_locations") {
            let name = dict.get_string_array("channel_locations", i)?;
            fmt.channel_locations.push(ChannelId::from_short_name(name)?);
        }
        Some(fmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo() -> AudioFormat {
        let mut fmt = AudioFormat {
            samples_per_frame: 1024,
            samplerate: 48000,
            num_channels: 2,
            sample_format: SampleFormat::S16,
            interleave_mode: InterleaveMode::All,
            ..AudioFormat::default()
        };
        fmt.set_default_channel_setup();
        fmt
    }

    #[test]
    fn dictionary_round_trip() {
        let fmt = stereo();
        let dict = fmt.to_dictionary();
        assert_eq!(AudioFormat::from_dictionary(&dict), Some(fmt));
    }

    #[test]
    fn channel_counts() {
        let mut fmt = AudioFormat {
            num_channels: 6,
            ..AudioFormat::default()
        };
        fmt.set_default_channel_setup();
        assert_eq!(fmt.num_front_channels(), 3);
        assert_eq!(fmt.num_rear_channels(), 2);
        assert_eq!(fmt.num_lfe_channels(), 1);
        assert_eq!(fmt.channel_index(ChannelId::Lfe), Some(3));
    }

    #[test]
    fn sizes() {
        let fmt = stereo();
        assert_eq!(fmt.sample_size(), 2);
        assert_eq!(fmt.buffer_size(), 1024 * 2 * 2);
    }

    #[test]
    fn nearest_samplerate_picks_closest() {
        let fmt = stereo();
        assert_eq!(fmt.nearest_samplerate(&[22050, 44100, 96000]), Some(44100));
        assert_eq!(fmt.nearest_samplerate(&[]), None);
    }
}
