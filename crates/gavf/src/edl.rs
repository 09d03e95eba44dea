//! Edit decision lists: virtual tracks built from ranges of other tracks.
//!
//! An EDL is a media info whose streams carry `segments` arrays. Each
//! segment maps a destination time range of the virtual track back onto a
//! source `(track, stream)` pair, optionally with a speed ratio and a URI
//! override. Playback consults the segments to turn destination times
//! into source reads.

use gavf_value::{Array, Dictionary, Value};

use crate::meta;
use crate::stats::StreamStats;
use crate::time::{time_rescale, time_scale, TIME_UNDEFINED};
use crate::track::{
    self, get_stream_all_mut, num_streams_all, stream_get_metadata_mut, stream_get_pts_range,
    stream_get_type, StreamType,
};

/// One segment's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Source track index within the EDL's children.
    pub track: i32,
    /// Source stream index within that track.
    pub stream: i32,
    /// Timescale the source times are expressed in.
    pub timescale: i32,
    pub src_time: i64,
    /// Destination time in the EDL stream's sample timescale.
    pub dst_time: i64,
    pub dst_duration: i64,
}

/// Create an EDL below `parent` (or standalone with `Dictionary::new`).
pub fn create(parent: &mut Dictionary) -> &mut Dictionary {
    parent.get_dictionary_create("edl")
}

/// Append an empty segment to a stream and return it.
pub fn add_segment(stream: &mut Dictionary) -> &mut Dictionary {
    let segments = stream.get_array_create(meta::EDL_SEGMENTS);
    segments.push(Value::Dictionary(Dictionary::new()));
    let idx = segments.len() - 1;
    match segments.get_mut(idx).and_then(Value::as_dictionary_mut) {
        Some(seg) => seg,
        None => unreachable!(),
    }
}

/// Fill the positional fields of a segment.
pub fn segment_set(seg: &mut Dictionary, s: Segment) {
    seg.set_int(meta::EDL_TRACK_IDX, s.track);
    seg.set_int(meta::EDL_STREAM_IDX, s.stream);
    seg.set_int(meta::STREAM_PACKET_TIMESCALE, s.timescale);
    seg.set_long(meta::EDL_SRC_TIME, s.src_time);
    seg.set_long(meta::EDL_DST_TIME, s.dst_time);
    seg.set_long(meta::EDL_DST_DUR, s.dst_duration);
}

/// Read the positional fields of a segment; all must be present.
pub fn segment_get(seg: &Dictionary) -> Option<Segment> {
    Some(Segment {
        track: seg.get_int(meta::EDL_TRACK_IDX)?,
        stream: seg.get_int(meta::EDL_STREAM_IDX)?,
        timescale: seg.get_int(meta::STREAM_PACKET_TIMESCALE)?,
        src_time: seg.get_long(meta::EDL_SRC_TIME)?,
        dst_time: seg.get_long(meta::EDL_DST_TIME)?,
        dst_duration: seg.get_long(meta::EDL_DST_DUR)?,
    })
}

/// Set the playback speed ratio of a segment.
pub fn segment_set_speed(seg: &mut Dictionary, num: i32, den: i32) {
    if num > 0 && den > 0 {
        seg.set_int(meta::EDL_SPEED_NUM, num);
        seg.set_int(meta::EDL_SPEED_DEN, den);
    }
}

/// Speed ratio of a segment, defaulting to 1/1.
pub fn segment_get_speed(seg: &Dictionary) -> (i32, i32) {
    (
        seg.get_int(meta::EDL_SPEED_NUM).unwrap_or(1),
        seg.get_int(meta::EDL_SPEED_DEN).unwrap_or(1),
    )
}

pub fn segment_set_uri(seg: &mut Dictionary, uri: &str) {
    seg.set_string(meta::URI, uri);
}

pub fn segment_get_uri(seg: &Dictionary) -> Option<&str> {
    seg.get_string(meta::URI)
}

fn sample_timescale(stream: &Dictionary) -> i32 {
    track::stream_get_sample_timescale(stream)
}

fn append_stream_segment(
    edl_stream: &mut Dictionary,
    src_stream: &Dictionary,
    stream_idx: usize,
    edl_duration: i64,
    track_duration: i64,
    uri: Option<&str>,
) {
    let ts_src = sample_timescale(src_stream);
    let ts_edl = sample_timescale(edl_stream);

    let (pts_start, pts_end) = stream_get_pts_range(src_stream)
        .unwrap_or((0, time_scale(ts_src, track_duration)));

    let seg = add_segment(edl_stream);
    segment_set(
        seg,
        Segment {
            track: 0,
            stream: stream_idx as i32,
            timescale: ts_src,
            src_time: pts_start,
            dst_time: time_scale(ts_edl, edl_duration)
                + time_rescale(ts_src, ts_edl, pts_start),
            dst_duration: time_rescale(ts_src, ts_edl, pts_end - pts_start),
        },
    );
    if let Some(uri) = uri {
        segment_set_uri(seg, uri);
    }
}

/// Append a whole source track at the end of the EDL timeline.
///
/// With `init` true the EDL track is rebuilt from the source track's
/// streams first (source-specific metadata cleared). One segment per
/// stream is synthesized, spanning the source track and placed at the
/// current end of the timeline.
pub fn append_track_to_timeline(
    edl_track: &mut Dictionary,
    source: &Dictionary,
    init: bool,
) -> bool {
    let Some(src_meta) = track::track_get_metadata(source) else {
        return false;
    };
    let edl_duration = if init {
        edl_track.reset();
        let m = edl_track.get_dictionary_create(meta::METADATA);
        *m = src_meta.clone();
        m.delete_fields(&[meta::SRC, meta::LABEL]);
        m.set_long(meta::APPROX_DURATION, 0);

        // Clone the source's stream layout, minus source-bound fields.
        for i in 0..num_streams_all(source) {
            let Some(src_stream) = track::get_stream_all(source, i) else {
                continue;
            };
            if stream_get_type(src_stream) == Some(StreamType::Msg) {
                continue;
            }
            let mut edl_stream = src_stream.clone();
            stream_get_metadata_mut(&mut edl_stream).delete_fields(&[
                meta::LABEL,
                meta::STREAM_PACKET_TIMESCALE,
                meta::AVG_BITRATE,
                meta::SRC,
            ]);
            edl_stream.remove(meta::STREAM_STATS);
            edl_track
                .get_array_create(meta::STREAMS)
                .push(Value::Dictionary(edl_stream));
        }
        0
    } else {
        track::track_get_duration(edl_track).max(0)
    };

    let uri = track::track_get_src(source, meta::SRC, 0).map(|(_, u)| u);
    let track_duration = src_meta.get_long(meta::APPROX_DURATION).unwrap_or(0);

    for stream_type in [
        StreamType::Audio,
        StreamType::Video,
        StreamType::Text,
        StreamType::Overlay,
    ] {
        let num = track::num_streams(edl_track, stream_type);
        for i in 0..num {
            let Some(src_stream) = track::get_stream(source, stream_type, i) else {
                break;
            };
            let src_stream = src_stream.clone();
            let uri = uri.map(str::to_owned);
            let Some(edl_stream) = track::get_stream_mut(edl_track, stream_type, i) else {
                break;
            };
            append_stream_segment(
                edl_stream,
                &src_stream,
                i,
                edl_duration,
                track_duration,
                uri.as_deref(),
            );
        }
    }

    finalize_track(edl_track)
}

fn finalize_stream(stream: &mut Dictionary, edl_uri: Option<&str>) -> bool {
    let Some(segments) = stream.get_array(meta::EDL_SEGMENTS) else {
        return false;
    };
    if segments.is_empty() {
        return false;
    }

    // Validate every segment and derive the stream's pts range from the
    // first and last.
    let mut first = None;
    let mut last = None;
    for val in segments.iter() {
        let Some(g) = val.as_dictionary().and_then(segment_get) else {
            return false;
        };
        if g.timescale <= 0
            || g.dst_duration < 0
            || g.src_time == TIME_UNDEFINED
            || g.dst_time == TIME_UNDEFINED
        {
            return false;
        }
        if first.is_none() {
            first = Some(g);
        }
        last = Some(g);
    }

    // Fill missing per-segment URIs from the EDL-level one.
    if let Some(uri) = edl_uri {
        if let Some(segments) = stream.get_array_mut(meta::EDL_SEGMENTS) {
            for val in segments.iter_mut() {
                if let Some(seg) = val.as_dictionary_mut() {
                    if segment_get_uri(seg).is_none() {
                        segment_set_uri(seg, uri);
                    }
                }
            }
        }
    }

    let (Some(first), Some(last)) = (first, last) else {
        return false;
    };
    let mut stats = StreamStats::new();
    stats.pts_start = first.dst_time;
    stats.pts_end = last.dst_time + last.dst_duration;
    stats.apply_generic(None, stream_get_metadata_mut(stream));
    true
}

fn finalize_track(edl_track: &mut Dictionary) -> bool {
    let edl_uri = edl_track.get_string(meta::URI).map(str::to_owned);
    for i in 0..num_streams_all(edl_track) {
        let Some(stream) = get_stream_all_mut(edl_track, i) else {
            continue;
        };
        if stream.get_array(meta::EDL_SEGMENTS).is_none() {
            continue;
        }
        if !finalize_stream(stream, edl_uri.as_deref()) {
            return false;
        }
    }
    track::track_set_duration(edl_track, 0);
    track::track_finalize(edl_track);
    true
}

/// Verify all tracks of an EDL and derive their durations.
pub fn finalize(edl: &mut Dictionary) -> bool {
    let n = track::num_tracks(edl);
    if n == 0 {
        return false;
    }
    let mut ok = true;
    for i in 0..n {
        let Some(t) = track::get_track_mut(edl, i) else {
            ok = false;
            continue;
        };
        if !finalize_track(t) {
            ok = false;
        }
    }
    edl.remove(meta::URI);
    ok
}

/// Number of segments on a stream.
pub fn num_segments(stream: &Dictionary) -> usize {
    stream.get_array(meta::EDL_SEGMENTS).map_or(0, Array::len)
}

/// Segment `idx` of a stream.
pub fn get_segment(stream: &Dictionary, idx: usize) -> Option<Segment> {
    segment_get(stream.get_array(meta::EDL_SEGMENTS)?.get(idx)?.as_dictionary()?)
}

/// Map a destination time to the segment covering it and the source time
/// within that segment.
pub fn map_time(stream: &Dictionary, dst_time: i64) -> Option<(Segment, i64)> {
    let segments = stream.get_array(meta::EDL_SEGMENTS)?;
    for val in segments {
        let seg = segment_get(val.as_dictionary()?)?;
        if dst_time >= seg.dst_time && dst_time < seg.dst_time + seg.dst_duration {
            let (num, den) = val
                .as_dictionary()
                .map_or((1, 1), segment_get_speed);
            let offset = (dst_time - seg.dst_time) * i64::from(num) / i64::from(den);
            return Some((seg, seg.src_time + offset));
        }
    }
    None
}
