//! Per-stream statistics, accumulated while packets flow and applied to
//! stream metadata on finalization.

use gavf_value::{AudioFormat, Dictionary, FramerateMode, VideoFormat};

use crate::compression::CompressionInfo;
use crate::meta;
use crate::packet::{Packet, PacketFlags};
use crate::time::{time_to_seconds, time_unscale, TIME_UNDEFINED};

/// Running statistics of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    /// Smallest packet size seen; -1 until the first packet.
    pub size_min: i32,
    pub size_max: i32,
    /// Smallest packet duration seen; [`TIME_UNDEFINED`] until observed.
    pub duration_min: i64,
    pub duration_max: i64,
    pub pts_start: i64,
    pub pts_end: i64,
    pub total_packets: i64,
    pub total_bytes: i64,
}

impl Default for StreamStats {
    fn default() -> Self {
        Self {
            size_min: -1,
            size_max: -1,
            duration_min: TIME_UNDEFINED,
            duration_max: TIME_UNDEFINED,
            pts_start: TIME_UNDEFINED,
            pts_end: TIME_UNDEFINED,
            total_packets: 0,
            total_bytes: 0,
        }
    }
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one packet.
    pub fn update(&mut self, p: &Packet) {
        self.update_params(p.pts, p.duration, p.data_len() as i64, p.flags);
    }

    /// Account for one packet given its raw parameters.
    ///
    /// NOOUTPUT packets keep their bytes counted but contribute neither
    /// duration nor packet count.
    pub fn update_params(&mut self, pts: i64, duration: i64, data_len: i64, flags: PacketFlags) {
        if self.pts_start == TIME_UNDEFINED {
            self.pts_start = pts;
        }
        if duration > 0 && !flags.contains(PacketFlags::NOOUTPUT) {
            if self.pts_end == TIME_UNDEFINED || self.pts_end < pts + duration {
                self.pts_end = pts + duration;
            }
            if self.duration_min == TIME_UNDEFINED || self.duration_min > duration {
                self.duration_min = duration;
            }
            if self.duration_max == TIME_UNDEFINED || self.duration_max < duration {
                self.duration_max = duration;
            }
        }
        if data_len > 0 {
            if self.size_min < 0 || i64::from(self.size_min) > data_len {
                self.size_min = data_len as i32;
            }
            if self.size_max < 0 || i64::from(self.size_max) < data_len {
                self.size_max = data_len as i32;
            }
            self.total_bytes += data_len;
        }
        if !flags.contains(PacketFlags::NOOUTPUT) {
            self.total_packets += 1;
        }
    }

    fn apply_bitrate(&self, timescale: i32, ci: Option<&CompressionInfo>, m: &mut Dictionary) {
        let known_bitrate = ci.is_some_and(|c| c.bitrate > 0);
        if !known_bitrate && self.total_bytes > 0 && self.pts_end > self.pts_start {
            let seconds = time_to_seconds(time_unscale(timescale, self.pts_end - self.pts_start));
            if seconds > 0.0 {
                // kbit/s
                let avg = self.total_bytes as f64 / (seconds * 125.0);
                m.set_float(meta::AVG_BITRATE, avg);
            }
        }
    }

    /// Derive metadata common to all stream kinds: max packet size into
    /// the compression info, total duration into the metadata.
    pub fn apply_generic(&self, ci: Option<&mut CompressionInfo>, m: &mut Dictionary) {
        if let Some(ci) = ci {
            if ci.max_packet_size <= 0 {
                ci.max_packet_size = self.size_max;
            }
        }
        if self.pts_end > 0 {
            let mut duration = self.pts_end;
            if self.pts_start != TIME_UNDEFINED && self.pts_start != 0 {
                duration -= self.pts_start;
            }
            m.set_long(meta::STREAM_DURATION, duration);
        }
    }

    /// Finalize an audio stream: average bitrate plus the generic fields.
    pub fn apply_audio(
        &self,
        fmt: Option<&AudioFormat>,
        ci: Option<&mut CompressionInfo>,
        m: &mut Dictionary,
    ) {
        if let Some(fmt) = fmt {
            self.apply_bitrate(fmt.samplerate, ci.as_deref(), m);
        }
        self.apply_generic(ci, m);
    }

    /// Finalize a video stream.
    ///
    /// Variable-framerate streams whose observed durations were constant
    /// are promoted to constant framerate with the observed period;
    /// otherwise the average framerate lands in the metadata.
    pub fn apply_video(
        &self,
        fmt: Option<&mut VideoFormat>,
        ci: Option<&mut CompressionInfo>,
        m: &mut Dictionary,
    ) {
        if let Some(fmt) = &fmt {
            self.apply_bitrate(fmt.timescale, ci.as_deref(), m);
        }
        let timescale = fmt.as_ref().map_or(0, |f| f.timescale);
        self.apply_generic(ci, m);
        if let Some(fmt) = fmt {
            if fmt.framerate_mode == FramerateMode::Variable {
                if self.duration_min > 0 && self.duration_min == self.duration_max {
                    fmt.framerate_mode = FramerateMode::Constant;
                    fmt.frame_duration = self.duration_min as i32;
                } else if self.total_packets > 0 && self.pts_end > self.pts_start {
                    let seconds =
                        time_to_seconds(time_unscale(timescale, self.pts_end - self.pts_start));
                    if seconds > 0.0 {
                        m.set_float(meta::AVG_FRAMERATE, self.total_packets as f64 / seconds);
                    }
                }
            }
        }
    }

    /// Finalize a subtitle/text stream.
    pub fn apply_subtitle(&self, m: &mut Dictionary) {
        self.apply_generic(None, m);
    }

    /// Serialize into the `stats` sub-dictionary form.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set_int(meta::STATS_SIZE_MIN, self.size_min);
        dict.set_int(meta::STATS_SIZE_MAX, self.size_max);
        dict.set_long(meta::STATS_DURATION_MIN, self.duration_min);
        dict.set_long(meta::STATS_DURATION_MAX, self.duration_max);
        dict.set_long(meta::STATS_PTS_START, self.pts_start);
        dict.set_long(meta::STATS_PTS_END, self.pts_end);
        dict.set_long(meta::STATS_NUM_PACKETS, self.total_packets);
        dict.set_long(meta::STATS_NUM_BYTES, self.total_bytes);
        dict
    }

    /// Rebuild from the `stats` sub-dictionary form; all keys required.
    pub fn from_dictionary(dict: &Dictionary) -> Option<Self> {
        Some(Self {
            size_min: dict.get_int(meta::STATS_SIZE_MIN)?,
            size_max: dict.get_int(meta::STATS_SIZE_MAX)?,
            duration_min: dict.get_long(meta::STATS_DURATION_MIN)?,
            duration_max: dict.get_long(meta::STATS_DURATION_MAX)?,
            pts_start: dict.get_long(meta::STATS_PTS_START)?,
            pts_end: dict.get_long(meta::STATS_PTS_END)?,
            total_packets: dict.get_long(meta::STATS_NUM_PACKETS)?,
            total_bytes: dict.get_long(meta::STATS_NUM_BYTES)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_tracks_ranges() {
        let mut stats = StreamStats::new();
        for i in 0..10i64 {
            stats.update_params(i * 1024, 1024, 4096, PacketFlags::empty());
        }
        assert_eq!(stats.pts_start, 0);
        assert_eq!(stats.pts_end, 10 * 1024);
        assert_eq!(stats.size_min, 4096);
        assert_eq!(stats.size_max, 4096);
        assert_eq!(stats.duration_min, 1024);
        assert_eq!(stats.duration_max, 1024);
        assert_eq!(stats.total_packets, 10);
        assert_eq!(stats.total_bytes, 40960);
    }

    #[test]
    fn nooutput_packets_keep_bytes_only() {
        let mut stats = StreamStats::new();
        stats.update_params(0, 100, 50, PacketFlags::NOOUTPUT);
        assert_eq!(stats.total_packets, 0);
        assert_eq!(stats.total_bytes, 50);
        assert_eq!(stats.duration_min, TIME_UNDEFINED);
    }

    #[test]
    fn vfr_promotes_to_cfr_on_constant_durations() {
        let mut stats = StreamStats::new();
        for i in 0..10i64 {
            stats.update_params(i, 1, 1000, PacketFlags::empty());
        }
        let mut fmt = VideoFormat {
            timescale: 25,
            framerate_mode: FramerateMode::Variable,
            ..VideoFormat::default()
        };
        let mut m = Dictionary::new();
        stats.apply_video(Some(&mut fmt), None, &mut m);
        assert_eq!(fmt.framerate_mode, FramerateMode::Constant);
        assert_eq!(fmt.frame_duration, 1);
        assert!(m.get_float(meta::AVG_FRAMERATE).is_none());
    }

    #[test]
    fn vfr_with_mixed_durations_gets_average() {
        let mut stats = StreamStats::new();
        stats.update_params(0, 1, 1000, PacketFlags::empty());
        stats.update_params(1, 2, 1000, PacketFlags::empty());
        stats.update_params(3, 1, 1000, PacketFlags::empty());
        let mut fmt = VideoFormat {
            timescale: 4,
            framerate_mode: FramerateMode::Variable,
            ..VideoFormat::default()
        };
        let mut m = Dictionary::new();
        stats.apply_video(Some(&mut fmt), None, &mut m);
        assert_eq!(fmt.framerate_mode, FramerateMode::Variable);
        // 3 packets over one second
        assert_eq!(m.get_float(meta::AVG_FRAMERATE), Some(3.0));
    }

    #[test]
    fn audio_bitrate() {
        let mut stats = StreamStats::new();
        // 48000 samples = 1 second, 12000 bytes = 96 kbit/s
        stats.update_params(0, 48000, 12000, PacketFlags::empty());
        let fmt = AudioFormat {
            samplerate: 48000,
            ..AudioFormat::default()
        };
        let mut m = Dictionary::new();
        stats.apply_audio(Some(&fmt), None, &mut m);
        let rate = m.get_float(meta::AVG_BITRATE).unwrap();
        assert!((rate - 96.0).abs() < 0.01);
        assert_eq!(m.get_long(meta::STREAM_DURATION), Some(48000));
    }

    #[test]
    fn dictionary_round_trip() {
        let mut stats = StreamStats::new();
        stats.update_params(100, 10, 1000, PacketFlags::empty());
        let dict = stats.to_dictionary();
        assert_eq!(StreamStats::from_dictionary(&dict), Some(stats));
        assert_eq!(StreamStats::from_dictionary(&Dictionary::new()), None);
    }
}
