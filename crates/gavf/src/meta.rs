//! Well-known dictionary keys of the track/stream schema.
//!
//! Unknown keys are preserved verbatim through copy, serialize and merge;
//! these are just the ones the schema assigns meaning to.

/* Generic object keys */
pub const URI: &str = "uri";
pub const MIMETYPE: &str = "mimetype";
/// Multi-valued source location entries on a track or stream.
pub const SRC: &str = "src";
pub const LABEL: &str = "label";
pub const MEDIA_CLASS: &str = "class";
pub const APPROX_DURATION: &str = "approx_duration";

/* Container structure */
/// Track array of a media info.
pub const CHILDREN: &str = "children";
/// Stream array of a track.
pub const STREAMS: &str = "streams";
/// Externally stored streams of a track.
pub const STREAMS_EXT: &str = "streams_ext";
pub const METADATA: &str = "metadata";
/// Index of the currently selected track on a media info.
pub const CURRENT_TRACK: &str = "current_track";

/* Stream keys */
pub const STREAM_TYPE: &str = "type";
pub const STREAM_ID: &str = "id";
pub const STREAM_ENABLED: &str = "enabled";
pub const AUDIO_FORMAT: &str = "audio_format";
pub const VIDEO_FORMAT: &str = "video_format";
pub const COMPRESSION_INFO: &str = "compression_info";
pub const STREAM_PACKET_TIMESCALE: &str = "packet_timescale";
pub const STREAM_SAMPLE_TIMESCALE: &str = "sample_timescale";
pub const STREAM_STATS: &str = "stats";
pub const STREAM_DURATION: &str = "stream_duration";
pub const AVG_BITRATE: &str = "avg_bitrate";
pub const AVG_FRAMERATE: &str = "avg_framerate";
pub const COMPRESSION_TAG: &str = "compression_tag";
pub const AUDIO_BITS: &str = "audio_bits";

/* Transport hints */
/// Transport-level hint sub-dictionary on track metadata.
pub const GAVF_DICT: &str = "gavf";
/// Where frames are stored (inside the gavf hint dictionary).
pub const GAVF_HWSTORAGE: &str = "hw";

/* Clock mapping */
pub const PTS_TO_CLOCK_TIME: &str = "pts_to_clock_time";
pub const PTS_TO_START_TIME: &str = "pts_to_start_time";

/* Stream stats sub-keys */
pub const STATS_SIZE_MIN: &str = "packet_size_min";
pub const STATS_SIZE_MAX: &str = "packet_size_max";
pub const STATS_DURATION_MIN: &str = "packet_duration_min";
pub const STATS_DURATION_MAX: &str = "packet_duration_max";
pub const STATS_PTS_START: &str = "pts_start";
pub const STATS_PTS_END: &str = "pts_end";
pub const STATS_NUM_PACKETS: &str = "num_packets";
pub const STATS_NUM_BYTES: &str = "num_bytes";

/* EDL keys */
/// Segment array of an EDL stream.
pub const EDL_SEGMENTS: &str = "segments";
pub const EDL_TRACK_IDX: &str = "track_idx";
pub const EDL_STREAM_IDX: &str = "stream_idx";
pub const EDL_SRC_TIME: &str = "src_time";
pub const EDL_DST_TIME: &str = "dst_time";
pub const EDL_DST_DUR: &str = "dst_duration";
pub const EDL_SPEED_NUM: &str = "speed_num";
pub const EDL_SPEED_DEN: &str = "speed_den";

/// Reserved stream id for GAVF control messages carried as packets.
pub const META_STREAM_ID_MSG_GAVF: i32 = -2;
