//! Conventions that give dictionaries their media semantics:
//! `media_info.children[] → track.streams[] → stream.metadata{}`.

use gavf_value::{Array, AudioFormat, Dictionary, Value, VideoFormat};
use tracing::warn;

use crate::compression::CompressionInfo;
use crate::meta;
use crate::stats::StreamStats;
use crate::time::{time_unscale, TIME_SCALE, TIME_UNDEFINED};

/// Kind of a stream. The values can be ORed into masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StreamType {
    Audio = 1 << 0,
    Video = 1 << 1,
    Text = 1 << 2,
    Overlay = 1 << 3,
    Msg = 1 << 4,
}

impl StreamType {
    /// Short name; doubles as the `type` value in stream dictionaries.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Text => "text",
            Self::Overlay => "overlay",
            Self::Msg => "msg",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Some(match name {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "text" => Self::Text,
            "overlay" => Self::Overlay,
            "msg" => Self::Msg,
            _ => return None,
        })
    }

    /// Position of this type in the stream ordering of a track.
    fn ordinal(self) -> u32 {
        match self {
            Self::Audio => 0,
            Self::Video => 1,
            Self::Text => 2,
            Self::Overlay => 3,
            Self::Msg => 4,
        }
    }
}

/* Stream-level accessors */

pub fn stream_get_type(s: &Dictionary) -> Option<StreamType> {
    StreamType::from_short_name(s.get_string(meta::STREAM_TYPE)?)
}

pub fn stream_get_id(s: &Dictionary) -> Option<i32> {
    s.get_int(meta::STREAM_ID)
}

pub fn stream_set_id(s: &mut Dictionary, id: i32) {
    s.set_int(meta::STREAM_ID, id);
}

pub fn stream_get_metadata(s: &Dictionary) -> Option<&Dictionary> {
    s.get_dictionary(meta::METADATA)
}

pub fn stream_get_metadata_mut(s: &mut Dictionary) -> &mut Dictionary {
    s.get_dictionary_create(meta::METADATA)
}

pub fn stream_get_audio_format(s: &Dictionary) -> Option<&AudioFormat> {
    s.get_audio_format(meta::AUDIO_FORMAT)
}

pub fn stream_set_audio_format(s: &mut Dictionary, fmt: AudioFormat) {
    s.set_audio_format(meta::AUDIO_FORMAT, fmt);
}

pub fn stream_get_video_format(s: &Dictionary) -> Option<&VideoFormat> {
    s.get_video_format(meta::VIDEO_FORMAT)
}

pub fn stream_set_video_format(s: &mut Dictionary, fmt: VideoFormat) {
    s.set_video_format(meta::VIDEO_FORMAT, fmt);
}

pub fn stream_get_compression_info(s: &Dictionary) -> Option<CompressionInfo> {
    CompressionInfo::from_dictionary(s.get_dictionary(meta::COMPRESSION_INFO)?).ok()
}

pub fn stream_set_compression_info(s: &mut Dictionary, ci: &CompressionInfo) {
    s.set_dictionary(meta::COMPRESSION_INFO, ci.to_dictionary());
}

pub fn stream_get_stats(s: &Dictionary) -> Option<StreamStats> {
    StreamStats::from_dictionary(s.get_dictionary(meta::STREAM_STATS)?)
}

pub fn stream_set_stats(s: &mut Dictionary, stats: &StreamStats) {
    s.set_dictionary(meta::STREAM_STATS, stats.to_dictionary());
}

/// Timescale of the packets of a stream; falls back to the natural
/// timescale of the stream's format.
pub fn stream_get_packet_timescale(s: &Dictionary) -> i32 {
    if let Some(scale) = stream_get_metadata(s).and_then(|m| m.get_int(meta::STREAM_PACKET_TIMESCALE))
    {
        return scale;
    }
    match stream_get_type(s) {
        Some(StreamType::Audio) => stream_get_audio_format(s).map_or(0, |f| f.samplerate),
        Some(StreamType::Video | StreamType::Overlay) => {
            stream_get_video_format(s).map_or(0, |f| f.timescale)
        }
        _ => 0,
    }
}

pub fn stream_set_packet_timescale(s: &mut Dictionary, scale: i32) {
    stream_get_metadata_mut(s).set_int(meta::STREAM_PACKET_TIMESCALE, scale);
}

/// Record the format-derived packet timescale in the stream metadata if
/// none is set yet.
pub fn stream_set_default_packet_timescale(s: &mut Dictionary) {
    if stream_get_metadata(s)
        .and_then(|m| m.get_int(meta::STREAM_PACKET_TIMESCALE))
        .is_none()
    {
        let scale = stream_get_packet_timescale(s);
        if scale > 0 {
            stream_set_packet_timescale(s, scale);
        }
    }
}

/// Timescale of the decoded samples of a stream.
pub fn stream_get_sample_timescale(s: &Dictionary) -> i32 {
    if let Some(scale) = stream_get_metadata(s).and_then(|m| m.get_int(meta::STREAM_SAMPLE_TIMESCALE))
    {
        return scale;
    }
    match stream_get_type(s) {
        Some(StreamType::Audio) => stream_get_audio_format(s).map_or(0, |f| f.samplerate),
        Some(StreamType::Video | StreamType::Overlay) => {
            stream_get_video_format(s).map_or(0, |f| f.timescale)
        }
        _ => 0,
    }
}

pub fn stream_set_sample_timescale(s: &mut Dictionary, scale: i32) {
    stream_get_metadata_mut(s).set_int(meta::STREAM_SAMPLE_TIMESCALE, scale);
}

pub fn stream_is_enabled(s: &Dictionary) -> bool {
    s.get_int(meta::STREAM_ENABLED).unwrap_or(1) != 0
}

pub fn stream_set_enabled(s: &mut Dictionary, enabled: bool) {
    s.set_int(meta::STREAM_ENABLED, i32::from(enabled));
}

/// PTS range of a stream from its stats.
pub fn stream_get_pts_range(s: &Dictionary) -> Option<(i64, i64)> {
    let stats = stream_get_stats(s)?;
    if stats.pts_start == TIME_UNDEFINED || stats.pts_end == TIME_UNDEFINED {
        return None;
    }
    Some((stats.pts_start, stats.pts_end))
}

/// True for streams with gapless timestamps (audio and constant-rate
/// video).
pub fn stream_is_continuous(s: &Dictionary) -> bool {
    match stream_get_type(s) {
        Some(StreamType::Audio) => true,
        Some(StreamType::Video) => stream_get_video_format(s).is_some_and(|f| {
            f.framerate_mode == gavf_value::FramerateMode::Constant
        }),
        _ => false,
    }
}

pub fn stream_get_compression_tag(s: &Dictionary) -> Option<i32> {
    s.get_int(meta::COMPRESSION_TAG)
}

pub fn stream_set_compression_tag(s: &mut Dictionary, tag: i32) {
    s.set_int(meta::COMPRESSION_TAG, tag);
}

pub fn stream_get_audio_bits(s: &Dictionary) -> Option<i32> {
    s.get_int(meta::AUDIO_BITS)
}

pub fn stream_set_audio_bits(s: &mut Dictionary, bits: i32) {
    s.set_int(meta::AUDIO_BITS, bits);
}

/* Track-level accessors */

fn streams(track: &Dictionary) -> Option<&Array> {
    track.get_array(meta::STREAMS)
}

/// Number of streams of `stream_type`.
pub fn num_streams(track: &Dictionary, stream_type: StreamType) -> usize {
    streams(track).map_or(0, |arr| {
        arr.iter()
            .filter_map(Value::as_dictionary)
            .filter(|s| stream_get_type(s) == Some(stream_type))
            .count()
    })
}

/// Number of streams of all types.
pub fn num_streams_all(track: &Dictionary) -> usize {
    streams(track).map_or(0, Array::len)
}

/// Stream by absolute position.
pub fn get_stream_all(track: &Dictionary, idx: usize) -> Option<&Dictionary> {
    streams(track)?.get(idx)?.as_dictionary()
}

pub fn get_stream_all_mut(track: &mut Dictionary, idx: usize) -> Option<&mut Dictionary> {
    track
        .get_array_mut(meta::STREAMS)?
        .get_mut(idx)?
        .as_dictionary_mut()
}

/// Stream by type and position within that type.
pub fn get_stream(track: &Dictionary, stream_type: StreamType, idx: usize) -> Option<&Dictionary> {
    let abs = stream_idx_to_abs(track, stream_type, idx)?;
    get_stream_all(track, abs)
}

pub fn get_stream_mut(
    track: &mut Dictionary,
    stream_type: StreamType,
    idx: usize,
) -> Option<&mut Dictionary> {
    let abs = stream_idx_to_abs(track, stream_type, idx)?;
    get_stream_all_mut(track, abs)
}

/// Map a relative-within-type index to the absolute position.
pub fn stream_idx_to_abs(
    track: &Dictionary,
    stream_type: StreamType,
    idx: usize,
) -> Option<usize> {
    let arr = streams(track)?;
    let mut rel = 0;
    for (abs, val) in arr.iter().enumerate() {
        let Some(s) = val.as_dictionary() else {
            continue;
        };
        if stream_get_type(s) == Some(stream_type) {
            if rel == idx {
                return Some(abs);
            }
            rel += 1;
        }
    }
    None
}

/// Map an absolute position to the relative index within its type.
pub fn stream_idx_to_rel(track: &Dictionary, idx: usize) -> Option<usize> {
    let arr = streams(track)?;
    let stream_type = stream_get_type(arr.get(idx)?.as_dictionary()?)?;
    Some(
        arr.iter()
            .take(idx)
            .filter_map(Value::as_dictionary)
            .filter(|s| stream_get_type(s) == Some(stream_type))
            .count(),
    )
}

/// Find a stream by its numeric id.
pub fn find_stream_by_id(track: &Dictionary, id: i32) -> Option<&Dictionary> {
    streams(track)?
        .iter()
        .filter_map(Value::as_dictionary)
        .find(|s| stream_get_id(s) == Some(id))
}

pub fn find_stream_by_id_mut(track: &mut Dictionary, id: i32) -> Option<&mut Dictionary> {
    track
        .get_array_mut(meta::STREAMS)?
        .iter_mut()
        .filter_map(Value::as_dictionary_mut)
        .find(|s| stream_get_id(s) == Some(id))
}

/// Append a stream of `stream_type`, keeping the type ordering
/// (audio, video, text, overlay, msg) and assigning the next free id.
///
/// Returns the absolute index of the new stream.
pub fn append_stream(track: &mut Dictionary, stream_type: StreamType) -> usize {
    let next_id = {
        let arr = track.get_array_create(meta::STREAMS);
        arr.iter()
            .filter_map(Value::as_dictionary)
            .filter_map(stream_get_id)
            .max()
            .unwrap_or(0)
            + 1
    };

    let mut stream = Dictionary::new();
    stream.set_string(meta::STREAM_TYPE, stream_type.short_name());
    stream_set_id(&mut stream, next_id);
    stream.set_dictionary(meta::METADATA, Dictionary::new());
    if stream_type == StreamType::Msg {
        stream_set_packet_timescale(&mut stream, TIME_SCALE as i32);
        stream_set_sample_timescale(&mut stream, TIME_SCALE as i32);
    }

    let arr = track.get_array_create(meta::STREAMS);
    // Insertion point: after the last stream whose type does not order
    // behind the new one.
    let mut insert = arr.len();
    for (i, val) in arr.iter().enumerate() {
        let Some(t) = val.as_dictionary().and_then(stream_get_type) else {
            continue;
        };
        if t.ordinal() > stream_type.ordinal() {
            insert = i;
            break;
        }
    }
    arr.splice_val(insert as isize, 0, Some(Value::Dictionary(stream)));
    insert
}

/// Append a stream and return it for configuration.
pub fn append_stream_mut(track: &mut Dictionary, stream_type: StreamType) -> &mut Dictionary {
    let idx = append_stream(track, stream_type);
    match get_stream_all_mut(track, idx) {
        Some(s) => s,
        // The stream was inserted at idx just above.
        None => unreachable!(),
    }
}

/// Delete a stream by type and relative index.
pub fn delete_stream(track: &mut Dictionary, stream_type: StreamType, idx: usize) -> bool {
    let Some(abs) = stream_idx_to_abs(track, stream_type, idx) else {
        return false;
    };
    delete_stream_abs(track, abs)
}

/// Delete a stream by absolute index.
pub fn delete_stream_abs(track: &mut Dictionary, idx: usize) -> bool {
    let Some(arr) = track.get_array_mut(meta::STREAMS) else {
        return false;
    };
    if idx >= arr.len() {
        return false;
    }
    arr.splice_val(idx as isize, 1, None);
    true
}

/// Append an externally stored stream.
pub fn append_external_stream<'a>(
    track: &'a mut Dictionary,
    stream_type: StreamType,
    mimetype: &str,
    location: &str,
) -> &'a mut Dictionary {
    let mut stream = Dictionary::new();
    stream.set_string(meta::STREAM_TYPE, stream_type.short_name());
    let mut src = Dictionary::new();
    src.set_string(meta::MIMETYPE, mimetype);
    src.set_string(meta::URI, location);
    stream_get_metadata_mut(&mut stream).append(meta::SRC, src);
    let arr = track.get_array_create(meta::STREAMS_EXT);
    arr.push(Value::Dictionary(stream));
    let idx = arr.len() - 1;
    match track
        .get_array_mut(meta::STREAMS_EXT)
        .and_then(|a| a.get_mut(idx))
        .and_then(Value::as_dictionary_mut)
    {
        Some(s) => s,
        None => unreachable!(),
    }
}

pub fn num_external_streams(track: &Dictionary) -> usize {
    track.get_array(meta::STREAMS_EXT).map_or(0, Array::len)
}

pub fn get_external_stream(track: &Dictionary, idx: usize) -> Option<&Dictionary> {
    track.get_array(meta::STREAMS_EXT)?.get(idx)?.as_dictionary()
}

pub fn track_get_metadata(track: &Dictionary) -> Option<&Dictionary> {
    track.get_dictionary(meta::METADATA)
}

pub fn track_get_metadata_mut(track: &mut Dictionary) -> &mut Dictionary {
    track.get_dictionary_create(meta::METADATA)
}

pub fn track_get_label(track: &Dictionary) -> Option<&str> {
    track_get_metadata(track)?.get_string(meta::LABEL)
}

pub fn track_set_label(track: &mut Dictionary, label: &str) {
    track_get_metadata_mut(track).set_string(meta::LABEL, label);
}

pub fn track_get_media_class(track: &Dictionary) -> Option<&str> {
    track_get_metadata(track)?.get_string(meta::MEDIA_CLASS)
}

pub fn track_set_media_class(track: &mut Dictionary, class: &str) {
    track_get_metadata_mut(track).set_string(meta::MEDIA_CLASS, class);
}

/// Approximate duration in [`TIME_SCALE`] units.
pub fn track_get_duration(track: &Dictionary) -> i64 {
    track_get_metadata(track)
        .and_then(|m| m.get_long(meta::APPROX_DURATION))
        .unwrap_or(TIME_UNDEFINED)
}

pub fn track_set_duration(track: &mut Dictionary, duration: i64) {
    track_get_metadata_mut(track).set_long(meta::APPROX_DURATION, duration);
}

/// Add a source location under `key` (normally [`meta::SRC`]).
pub fn track_add_src(track: &mut Dictionary, key: &str, mimetype: Option<&str>, location: &str) {
    let mut src = Dictionary::new();
    if let Some(m) = mimetype {
        src.set_string(meta::MIMETYPE, m);
    }
    src.set_string(meta::URI, location);
    track_get_metadata_mut(track).append(key, src);
}

/// Source entry `idx` under `key`: `(mimetype, location)`.
pub fn track_get_src<'a>(
    track: &'a Dictionary,
    key: &str,
    idx: usize,
) -> Option<(Option<&'a str>, &'a str)> {
    let src = track_get_metadata(track)?
        .get_item(key, idx)?
        .as_dictionary()?;
    Some((src.get_string(meta::MIMETYPE), src.get_string(meta::URI)?))
}

/// True if `location` is already among the sources under `key`.
pub fn track_has_src(track: &Dictionary, key: &str, location: &str) -> bool {
    let mut idx = 0;
    while let Some((_, uri)) = track_get_src(track, key, idx) {
        if uri == location {
            return true;
        }
        idx += 1;
    }
    false
}

/// Build a minimal track referencing `location`, labeled by its basename.
pub fn track_from_location(location: &str) -> Dictionary {
    let mut track = Dictionary::new();
    track_add_src(&mut track, meta::SRC, None, location);
    let base = location
        .rsplit('/')
        .next()
        .map(|name| name.split('?').next().unwrap_or(name))
        .unwrap_or(location);
    let label = base.rsplit_once('.').map_or(base, |(stem, _)| stem);
    if !label.is_empty() {
        track_set_label(&mut track, label);
    }
    track
}

/// Derive the track duration from the stream stats: the span from the
/// earliest stream start to the latest stream end.
pub fn track_compute_duration(track: &mut Dictionary) {
    let mut start = TIME_UNDEFINED;
    let mut end = TIME_UNDEFINED;
    for idx in 0..num_streams_all(track) {
        let Some(s) = get_stream_all(track, idx) else {
            continue;
        };
        let Some((pts_start, pts_end)) = stream_get_pts_range(s) else {
            continue;
        };
        let scale = stream_get_packet_timescale(s);
        let t0 = time_unscale(scale, pts_start);
        let t1 = time_unscale(scale, pts_end);
        if t0 == TIME_UNDEFINED || t1 == TIME_UNDEFINED {
            continue;
        }
        if start == TIME_UNDEFINED || t0 < start {
            start = t0;
        }
        if end == TIME_UNDEFINED || t1 > end {
            end = t1;
        }
    }
    if start != TIME_UNDEFINED && end != TIME_UNDEFINED {
        track_set_duration(track, end - start);
    }
}

/// Finalize a track: derive the approximate duration from the per-stream
/// durations recorded in stream metadata.
pub fn track_finalize(track: &mut Dictionary) {
    let mut duration = TIME_UNDEFINED;
    for idx in 0..num_streams_all(track) {
        let Some(s) = get_stream_all(track, idx) else {
            continue;
        };
        let Some(stream_duration) = stream_get_metadata(s)
            .and_then(|m| m.get_long(meta::STREAM_DURATION))
        else {
            continue;
        };
        let scale = stream_get_sample_timescale(s);
        let t = time_unscale(scale, stream_duration);
        if t != TIME_UNDEFINED && (duration == TIME_UNDEFINED || t > duration) {
            duration = t;
        }
    }
    if duration != TIME_UNDEFINED {
        track_set_duration(track, duration);
    }
}

/// Merge the serialized stats of a footer back into the track,
/// stream for stream by ordinal.
pub fn track_apply_footer(track: &mut Dictionary, footer: &Dictionary) {
    let n = num_streams_all(track);
    if num_streams_all(footer) != n {
        warn!(
            track_streams = n,
            footer_streams = num_streams_all(footer),
            "stream counts of track and footer do not match"
        );
        return;
    }
    for i in 0..n {
        let Some(footer_stream) = get_stream_all(footer, i) else {
            continue;
        };
        let footer_stream = footer_stream.clone();
        if let Some(track_stream) = get_stream_all_mut(track, i) {
            track_stream.merge2(&footer_stream);
        }
    }
}

/* Media info */

/// Number of tracks in a media info.
pub fn num_tracks(mi: &Dictionary) -> usize {
    mi.get_array(meta::CHILDREN).map_or(0, Array::len)
}

pub fn get_track(mi: &Dictionary, idx: usize) -> Option<&Dictionary> {
    mi.get_array(meta::CHILDREN)?.get(idx)?.as_dictionary()
}

pub fn get_track_mut(mi: &mut Dictionary, idx: usize) -> Option<&mut Dictionary> {
    mi.get_array_mut(meta::CHILDREN)?
        .get_mut(idx)?
        .as_dictionary_mut()
}

/// Append a track to a media info; returns its index.
pub fn append_track(mi: &mut Dictionary, track: Dictionary) -> usize {
    let arr = mi.get_array_create(meta::CHILDREN);
    arr.push(Value::Dictionary(track));
    arr.len() - 1
}

pub fn set_current_track(mi: &mut Dictionary, idx: usize) {
    mi.set_int(meta::CURRENT_TRACK, idx as i32);
}

pub fn get_current_track(mi: &Dictionary) -> usize {
    mi.get_int(meta::CURRENT_TRACK).unwrap_or(0).max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_keep_type_order() {
        let mut track = Dictionary::new();
        append_stream(&mut track, StreamType::Video);
        append_stream(&mut track, StreamType::Msg);
        append_stream(&mut track, StreamType::Audio);
        append_stream(&mut track, StreamType::Text);
        append_stream(&mut track, StreamType::Audio);

        let types: Vec<_> = (0..num_streams_all(&track))
            .filter_map(|i| stream_get_type(get_stream_all(&track, i).unwrap()))
            .collect();
        assert_eq!(
            types,
            vec![
                StreamType::Audio,
                StreamType::Audio,
                StreamType::Video,
                StreamType::Text,
                StreamType::Msg
            ]
        );
    }

    #[test]
    fn ids_are_stable_under_deletion() {
        let mut track = Dictionary::new();
        append_stream(&mut track, StreamType::Audio);
        append_stream(&mut track, StreamType::Audio);
        append_stream(&mut track, StreamType::Video);

        let id2 = stream_get_id(get_stream(&track, StreamType::Audio, 1).unwrap()).unwrap();
        assert!(delete_stream(&mut track, StreamType::Audio, 0));

        // Position moved, id did not.
        let s = get_stream(&track, StreamType::Audio, 0).unwrap();
        assert_eq!(stream_get_id(s), Some(id2));

        // New streams never reuse an id that is still in use.
        append_stream(&mut track, StreamType::Audio);
        let ids: Vec<_> = (0..num_streams_all(&track))
            .filter_map(|i| stream_get_id(get_stream_all(&track, i).unwrap()))
            .collect();
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn abs_rel_index_mapping() {
        let mut track = Dictionary::new();
        append_stream(&mut track, StreamType::Audio);
        append_stream(&mut track, StreamType::Audio);
        append_stream(&mut track, StreamType::Video);
        append_stream(&mut track, StreamType::Overlay);

        assert_eq!(stream_idx_to_abs(&track, StreamType::Video, 0), Some(2));
        assert_eq!(stream_idx_to_abs(&track, StreamType::Audio, 1), Some(1));
        assert_eq!(stream_idx_to_abs(&track, StreamType::Msg, 0), None);
        assert_eq!(stream_idx_to_rel(&track, 2), Some(0));
        assert_eq!(stream_idx_to_rel(&track, 1), Some(1));
    }

    #[test]
    fn find_by_id() {
        let mut track = Dictionary::new();
        append_stream(&mut track, StreamType::Audio);
        append_stream(&mut track, StreamType::Video);
        let id = stream_get_id(get_stream(&track, StreamType::Video, 0).unwrap()).unwrap();
        assert!(find_stream_by_id(&track, id).is_some());
        assert!(find_stream_by_id(&track, 999).is_none());
    }

    #[test]
    fn src_entries_are_multivalued() {
        let mut track = Dictionary::new();
        track_add_src(&mut track, meta::SRC, Some("video/mp4"), "file:///a.mp4");
        track_add_src(&mut track, meta::SRC, None, "http://example.com/a");
        assert!(track_has_src(&track, meta::SRC, "file:///a.mp4"));
        assert!(!track_has_src(&track, meta::SRC, "file:///b.mp4"));
        let (mime, uri) = track_get_src(&track, meta::SRC, 0).unwrap();
        assert_eq!(mime, Some("video/mp4"));
        assert_eq!(uri, "file:///a.mp4");
        assert_eq!(track_get_src(&track, meta::SRC, 2), None);
    }

    #[test]
    fn from_location_labels_basename() {
        let track = track_from_location("/media/movies/some.film.gavf");
        assert_eq!(track_get_label(&track), Some("some.film"));
        assert_eq!(
            track_get_src(&track, meta::SRC, 0).map(|s| s.1),
            Some("/media/movies/some.film.gavf")
        );
    }

    #[test]
    fn apply_footer_merges_stats() {
        let mut track = Dictionary::new();
        append_stream(&mut track, StreamType::Audio);

        let mut footer = Dictionary::new();
        let footer_stream = append_stream_mut(&mut footer, StreamType::Audio);
        let mut stats = StreamStats::new();
        stats.update_params(0, 100, 1000, crate::packet::PacketFlags::empty());
        stream_set_stats(footer_stream, &stats);

        track_apply_footer(&mut track, &footer);
        let s = get_stream_all(&track, 0).unwrap();
        assert_eq!(stream_get_stats(s), Some(stats));
    }

    #[test]
    fn msg_streams_get_global_timescale() {
        let mut track = Dictionary::new();
        let s = append_stream_mut(&mut track, StreamType::Msg);
        assert_eq!(stream_get_packet_timescale(s), TIME_SCALE as i32);
    }
}
