//! The GAVF demuxer.

use std::io::SeekFrom;

use gavf_io::{Chunk, IoStream};
use gavf_value::Dictionary;
use tracing::{debug, warn};

use crate::meta;
use crate::msg::Msg;
use crate::packet::Packet;
use crate::serialize::read_dictionary;
use crate::time::{time_rescale, TIME_UNDEFINED};
use crate::track::{
    self, stream_get_audio_format, stream_get_id, stream_get_packet_timescale, stream_get_type,
    stream_get_video_format, StreamType,
};
use crate::transport::packet_index::PacketIndex;
use crate::transport::packets::{
    read_packet_header, read_packet_payload, skip_packet_payload, PACKET_MARKER,
};
use crate::transport::{
    TAG_FOOTER, TAG_PACKETS, TAG_PACKET_INDEX, TAG_PROGRAM_END, TAG_PROGRAM_HEADER, TAG_TAIL,
};
use crate::{Error, Result};

/// What a demux iteration produced.
#[derive(Debug)]
pub enum ReadEvent {
    Packet(Packet),
    /// A control message that rode the reserved message stream.
    Message(Msg),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Program header read, packet chunk header not yet consumed.
    PktsPending,
    PktsOpen,
    Done,
}

struct ReadSlot {
    id: i32,
    stream_type: StreamType,
    timescale: i32,
    /// Default duration filled into packets that carry none.
    packet_duration: i64,
    sync_pts: i64,
    skip: bool,
}

/// Reads the program header and demultiplexes the packet stream.
///
/// At end of stream the trailing chunks are processed: a footer is merged
/// into the track dictionary, a packet index enables seeking, a further
/// program header opens the next program of a concatenated file.
pub struct Reader {
    io: IoStream,
    state: State,
    media_info: Dictionary,
    slots: Vec<ReadSlot>,
    packets_chunk: Option<Chunk>,
    index: Option<PacketIndex>,
}

impl Reader {
    /// Read the program header and set up for demuxing.
    pub fn open(mut io: IoStream) -> Result<Self> {
        let head = io.chunk_read_header()?;
        if !head.is(TAG_PROGRAM_HEADER) {
            return Err(Error::Parse(format!(
                "expected program header, got {:?}",
                head.tag_str()
            )));
        }
        let dict = read_dictionary(&mut io)?;

        // The header carries either a single track or a whole media info.
        let mut media_info = if dict.get_array(meta::CHILDREN).is_some() {
            dict
        } else {
            let mut mi = Dictionary::new();
            track::append_track(&mut mi, dict);
            mi
        };
        let cur = track::get_current_track(&media_info);
        track::set_current_track(&mut media_info, cur);

        let mut reader = Self {
            io,
            state: State::PktsPending,
            media_info,
            slots: Vec::new(),
            packets_chunk: None,
            index: None,
        };
        reader.build_slots()?;
        debug!(streams = reader.slots.len(), "program header read");
        Ok(reader)
    }

    fn build_slots(&mut self) -> Result<()> {
        let cur = track::get_current_track(&self.media_info);
        let Some(track) = track::get_track(&self.media_info, cur) else {
            return Err(Error::Parse("program header without track".into()));
        };
        let mut slots = Vec::new();
        for idx in 0..track::num_streams_all(track) {
            let Some(s) = track::get_stream_all(track, idx) else {
                continue;
            };
            let (Some(id), Some(stream_type)) = (stream_get_id(s), stream_get_type(s)) else {
                return Err(Error::Parse(format!("stream {idx} without id or type")));
            };
            let timescale = match stream_type {
                StreamType::Audio => stream_get_audio_format(s).map_or(0, |f| f.samplerate),
                StreamType::Video | StreamType::Overlay => {
                    stream_get_video_format(s).map_or(0, |f| f.timescale)
                }
                _ => stream_get_packet_timescale(s),
            };
            let packet_duration = match stream_type {
                StreamType::Video => stream_get_video_format(s)
                    .filter(|f| f.framerate_mode == gavf_value::FramerateMode::Constant)
                    .map_or(0, |f| i64::from(f.frame_duration)),
                _ => 0,
            };
            slots.push(ReadSlot {
                id,
                stream_type,
                timescale,
                packet_duration,
                sync_pts: TIME_UNDEFINED,
                skip: false,
            });
        }
        self.slots = slots;
        Ok(())
    }

    pub fn media_info(&self) -> &Dictionary {
        &self.media_info
    }

    /// The currently selected track.
    pub fn current_track(&self) -> Option<&Dictionary> {
        track::get_track(&self.media_info, track::get_current_track(&self.media_info))
    }

    fn current_track_mut(&mut self) -> Option<&mut Dictionary> {
        let cur = track::get_current_track(&self.media_info);
        track::get_track_mut(&mut self.media_info, cur)
    }

    /// The packet index, once the trailing chunks were reached (or
    /// [`Reader::load_index`] was called on a seekable stream).
    pub fn index(&self) -> Option<&PacketIndex> {
        self.index.as_ref()
    }

    /// Skip payloads of the stream with `id`; headers are still parsed.
    pub fn set_stream_skip(&mut self, id: i32, skip: bool) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.skip = skip;
        }
    }

    /// Per-stream sync PTS snapshot of the last seek.
    pub fn sync_pts(&self) -> Vec<(i32, i64)> {
        self.slots.iter().map(|s| (s.id, s.sync_pts)).collect()
    }

    /// One demux iteration: the next packet or message, or EOF after the
    /// trailing chunks have been handled.
    pub fn next_event(&mut self) -> Result<ReadEvent> {
        loop {
            match self.state {
                State::Done => return Ok(ReadEvent::Eof),
                State::PktsPending => {
                    let head = match self.io.chunk_read_header() {
                        Ok(head) => head,
                        Err(e) if e.is_eof() => {
                            self.state = State::Done;
                            return Ok(ReadEvent::Eof);
                        }
                        Err(e) => return Err(e.into()),
                    };
                    if !self.handle_chunk(&head)? {
                        return Ok(ReadEvent::Eof);
                    }
                }
                State::PktsOpen => {
                    // A known chunk length bounds the packet stream; with
                    // length 0 it extends until something that is not a
                    // packet.
                    if let Some(chunk) = &self.packets_chunk {
                        if chunk.len > 0 && self.io.position() >= chunk.start + chunk.len {
                            self.state = State::PktsPending;
                            continue;
                        }
                    }
                    let mut marker = [0u8; 1];
                    let n = self.io.peek_data(&mut marker)?;
                    if n == 0 {
                        self.state = State::Done;
                        self.io.set_eof();
                        return Ok(ReadEvent::Eof);
                    }
                    if marker[0] != PACKET_MARKER {
                        // Alignment zeros and the next chunk header.
                        self.state = State::PktsPending;
                        continue;
                    }
                    if let Some(event) = self.read_one_packet()? {
                        return Ok(event);
                    }
                }
            }
        }
    }

    fn read_one_packet(&mut self) -> Result<Option<ReadEvent>> {
        let start_pos = self.io.position();
        let mut p = Packet::new();
        let payload_len = read_packet_header(&mut self.io, &mut p)?;

        if p.id == meta::META_STREAM_ID_MSG_GAVF {
            read_packet_payload(&mut self.io, &mut p, payload_len)?;
            let m = Msg::from_packet(&p)?;
            return Ok(Some(ReadEvent::Message(m)));
        }

        let Some(slot) = self.slots.iter().find(|s| s.id == p.id) else {
            warn!(id = p.id, "packet for unknown stream");
            skip_packet_payload(&mut self.io, payload_len)?;
            return Ok(None);
        };
        if p.duration == 0 {
            p.duration = slot.packet_duration;
        }
        if slot.skip {
            skip_packet_payload(&mut self.io, payload_len)?;
            return Ok(None);
        }
        read_packet_payload(&mut self.io, &mut p, payload_len)?;
        p.position = start_pos;
        Ok(Some(ReadEvent::Packet(p)))
    }

    /// The next media packet, transparently skipping control messages.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            match self.next_event()? {
                ReadEvent::Packet(p) => return Ok(Some(p)),
                ReadEvent::Message(_) => {}
                ReadEvent::Eof => return Ok(None),
            }
        }
    }

    /// Process one trailing/top-level chunk. Returns false at end of
    /// file.
    fn handle_chunk(&mut self, head: &Chunk) -> Result<bool> {
        if head.is(TAG_PACKETS) {
            self.packets_chunk = Some(head.clone());
            self.state = State::PktsOpen;
            return Ok(true);
        }
        if head.is(TAG_FOOTER) {
            let footer = read_dictionary(&mut self.io)?;
            if let Some(track) = self.current_track_mut() {
                track::track_apply_footer(track, &footer);
            }
            debug!("footer merged");
            return Ok(true);
        }
        if head.is(TAG_PACKET_INDEX) {
            self.index = Some(PacketIndex::read(&mut self.io)?);
            debug!(
                entries = self.index.as_ref().map_or(0, PacketIndex::len),
                "packet index loaded"
            );
            return Ok(true);
        }
        if head.is(TAG_TAIL) {
            // The length field of a tail chunk is the offset of the chunk
            // itself, already consumed with the header.
            Ok(true)
        } else if head.is(TAG_PROGRAM_HEADER) {
            // Concatenated file: the next program starts here.
            let dict = read_dictionary(&mut self.io)?;
            let idx = track::append_track(&mut self.media_info, dict);
            track::set_current_track(&mut self.media_info, idx);
            self.packets_chunk = None;
            self.build_slots()?;
            debug!(track = idx, "next program header read");
            Ok(true)
        } else if head.is(TAG_PROGRAM_END) {
            Ok(true)
        } else {
            // Unknown chunk: skip it if its length is known, otherwise
            // nothing more can be parsed.
            if head.len > 0 {
                self.io.skip(head.len)?;
                Ok(true)
            } else {
                self.state = State::Done;
                Ok(false)
            }
        }
    }

    /// Load the trailing index of a seekable file without disturbing the
    /// read position, via the tail chunk at EOF.
    pub fn load_index(&mut self) -> Result<bool> {
        if self.index.is_some() {
            return Ok(true);
        }
        if !self.io.can_seek() {
            return Ok(false);
        }
        let saved = self.io.position();
        let total = self.io.total_bytes();
        if total < 16 {
            return Ok(false);
        }
        self.io.seek(SeekFrom::Start((total - 16) as u64))?;
        let mut tag = [0u8; 8];
        self.io.read_exact(&mut tag)?;
        if &tag != TAG_TAIL.as_bytes() {
            // No tail: the file was truncated, no index to find.
            self.io.seek(SeekFrom::Start(saved as u64))?;
            return Ok(false);
        }
        let _tail_pos = self.io.read_i64_le()?;
        // Scan the chunk headers from the start; every chunk written by a
        // seekable muxer carries its length, so this only touches headers.
        self.io.seek(SeekFrom::Start(0))?;
        loop {
            let head = match self.io.chunk_read_header() {
                Ok(head) => head,
                Err(e) if e.is_eof() => break,
                Err(e) => return Err(e.into()),
            };
            if head.is(TAG_PACKET_INDEX) {
                self.index = Some(PacketIndex::read(&mut self.io)?);
                break;
            }
            if head.is(TAG_TAIL) {
                break;
            }
            if head.len > 0 {
                self.io.skip(head.len)?;
            } else {
                break;
            }
        }
        self.io.seek(SeekFrom::Start(saved as u64))?;
        Ok(self.index.is_some())
    }

    /// Seek to `time` (expressed in `scale` ticks per second).
    ///
    /// Needs the packet index and a seekable stream. Every indexed stream
    /// is positioned at the nearest keyframe at or before the target; the
    /// returned snapshot holds the per-stream sync PTS. Streams without
    /// index entries report [`TIME_UNDEFINED`].
    pub fn seek(&mut self, time: i64, scale: i32) -> Result<Option<Vec<(i32, i64)>>> {
        if self.index.is_none() {
            self.load_index()?;
        }
        let Some(index) = &self.index else {
            return Ok(None);
        };
        if !self.io.can_seek() {
            return Ok(None);
        }

        let mut position: Option<u64> = None;
        for slot in &mut self.slots {
            slot.sync_pts = TIME_UNDEFINED;
            if slot.stream_type == StreamType::Msg {
                continue;
            }
            let target = time_rescale(scale, slot.timescale, time);
            let Some(found) = index.seek_pts(slot.id, target) else {
                continue;
            };
            let kf = index.keyframe_before(found);
            let Some(entry) = index.get(kf) else {
                continue;
            };
            slot.sync_pts = entry.pts;
            position = Some(position.map_or(entry.position, |p| p.min(entry.position)));
        }

        let Some(position) = position else {
            return Ok(None);
        };
        self.io.seek(SeekFrom::Start(position))?;
        self.state = State::PktsOpen;
        Ok(Some(self.sync_pts()))
    }

    /// Send a command upstream on a duplex io.
    pub fn send_command(&mut self, m: &Msg) -> Result<()> {
        if !self.io.is_duplex() {
            return Err(Error::Unsupported("command channel needs a duplex io"));
        }
        m.write(&mut self.io)?;
        self.io.flush()?;
        Ok(())
    }
}
