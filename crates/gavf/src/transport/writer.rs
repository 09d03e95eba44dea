//! The GAVF muxer.

use gavf_io::{Chunk, IoStream};
use gavf_value::Dictionary;
use tracing::debug;

use crate::meta;
use crate::msg::{self, Msg};
use crate::packet::Packet;
use crate::serialize::write_dictionary;
use crate::stats::StreamStats;
use crate::track::{
    self, stream_get_audio_format, stream_get_id, stream_get_type, stream_get_video_format,
    stream_set_id, stream_set_stats, StreamType,
};
use crate::transport::packet_index::PacketIndex;
use crate::transport::packets::write_packet;
use crate::transport::{
    TAG_FOOTER, TAG_PACKETS, TAG_PACKET_INDEX, TAG_PROGRAM_HEADER, TAG_TAIL,
};
use crate::{Error, Result, SinkStatus};

/// Muxer options.
#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    /// Keep a packet index and write it as `GAVFPIDX` on close.
    pub write_index: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { write_index: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    PktsOpen,
    Done,
}

struct StreamSlot {
    id: i32,
    stream_type: StreamType,
    /// Constant packet duration; suppresses the per-packet extension.
    packet_duration: i64,
    stats: StreamStats,
}

/// Writes a program header, a multiplexed packet stream and the trailing
/// chunks onto an io.
///
/// State machine: `start` accepts the track dictionary, writes
/// `GAVFPHDR` and opens `GAVFPKTS`; `write_packet` streams packets;
/// `close` finishes the packet chunk and emits `GAVFFOOT`,
/// optionally `GAVFPIDX`, and `GAVFTAIL`.
pub struct Writer {
    io: IoStream,
    state: State,
    opts: WriterOptions,
    track: Dictionary,
    slots: Vec<StreamSlot>,
    packets_chunk: Option<Chunk>,
    index: Option<PacketIndex>,
    /// Set when the peer asked us to stop.
    stopped: bool,
    paused: bool,
}

impl Writer {
    pub fn new(io: IoStream, opts: WriterOptions) -> Self {
        Self {
            io,
            state: State::Init,
            opts,
            track: Dictionary::new(),
            slots: Vec::new(),
            packets_chunk: None,
            index: None,
            stopped: false,
            paused: false,
        }
    }

    pub fn io(&mut self) -> &mut IoStream {
        &mut self.io
    }

    /// The track as it will appear in the program header.
    pub fn track(&self) -> &Dictionary {
        &self.track
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Accept the track description, write the program header and open
    /// the packet stream.
    pub fn start(&mut self, track: &Dictionary) -> Result<()> {
        if self.state != State::Init {
            return Err(Error::InvalidState("start() after start()"));
        }
        self.track = track.clone();

        // Make sure every stream has an id before the header goes out.
        let mut next_id = 1;
        for idx in 0..track::num_streams_all(&self.track) {
            if let Some(s) = track::get_stream_all(&self.track, idx) {
                if let Some(id) = stream_get_id(s) {
                    next_id = next_id.max(id + 1);
                }
            }
        }
        for idx in 0..track::num_streams_all(&self.track) {
            let Some(s) = track::get_stream_all_mut(&mut self.track, idx) else {
                continue;
            };
            if stream_get_id(s).is_none() {
                stream_set_id(s, next_id);
                next_id += 1;
            }
            track::stream_set_default_packet_timescale(s);
        }

        self.slots.clear();
        for idx in 0..track::num_streams_all(&self.track) {
            let Some(s) = track::get_stream_all(&self.track, idx) else {
                continue;
            };
            let (Some(id), Some(stream_type)) = (stream_get_id(s), stream_get_type(s)) else {
                return Err(Error::Parse(format!("stream {idx} without id or type")));
            };
            let packet_duration = match stream_type {
                StreamType::Video => stream_get_video_format(s)
                    .filter(|f| {
                        f.framerate_mode == gavf_value::FramerateMode::Constant
                    })
                    .map_or(0, |f| i64::from(f.frame_duration)),
                _ => 0,
            };
            self.slots.push(StreamSlot {
                id,
                stream_type,
                packet_duration,
                stats: StreamStats::new(),
            });
        }

        // The header chunk is buffered so its length is known even on
        // non-seekable sinks.
        let (mut chunk, mut sub) = self.io.chunk_start_io(TAG_PROGRAM_HEADER);
        write_dictionary(&mut sub, &self.track)?;
        self.io.chunk_finish_io(&mut chunk, sub)?;

        self.packets_chunk = Some(self.io.chunk_start(TAG_PACKETS)?);
        if self.opts.write_index {
            self.index = Some(PacketIndex::new());
        }
        self.state = State::PktsOpen;
        debug!(streams = self.slots.len(), "program started");
        Ok(())
    }

    /// Write one packet. The stream id must match the program header,
    /// except for the reserved message stream.
    pub fn write_packet(&mut self, p: &Packet) -> Result<SinkStatus> {
        if self.state != State::PktsOpen {
            return Err(Error::InvalidState("write_packet() outside packet stream"));
        }
        if self.stopped {
            return Ok(SinkStatus::Stopped);
        }

        let mut default_duration = 0;
        if p.id != meta::META_STREAM_ID_MSG_GAVF {
            let Some(slot) = self.slots.iter_mut().find(|s| s.id == p.id) else {
                return Err(Error::UnknownStream(p.id));
            };
            slot.stats.update(p);
            default_duration = slot.packet_duration;
        }

        let position = self.io.position();
        if let Some(index) = &mut self.index {
            if p.id != meta::META_STREAM_ID_MSG_GAVF {
                index.add_packet(p, position as u64);
            }
        }
        match write_packet(&mut self.io, p, default_duration) {
            Ok(()) => Ok(SinkStatus::Ok),
            Err(e) if self.io.got_error() => {
                debug!(error = %e, "packet write failed");
                Ok(SinkStatus::Error)
            }
            Err(e) => Err(e),
        }
    }

    /// Send a control message downstream as a packet on the reserved
    /// message stream.
    pub fn write_message(&mut self, m: &Msg) -> Result<SinkStatus> {
        let p = m.to_packet()?;
        self.write_packet(&p)
    }

    /// Stats accumulated so far for the stream with `id`.
    pub fn stream_stats(&self, id: i32) -> Option<&StreamStats> {
        self.slots.iter().find(|s| s.id == id).map(|s| &s.stats)
    }

    /// Build the footer dictionary: the track structure with each stream
    /// reduced to its type and stats.
    fn footer(&self) -> Dictionary {
        let mut footer = Dictionary::new();
        for slot in &self.slots {
            let mut stream = Dictionary::new();
            stream.set_string(meta::STREAM_TYPE, slot.stream_type.short_name());
            stream_set_id(&mut stream, slot.id);
            stream_set_stats(&mut stream, &slot.stats);
            footer
                .get_array_create(meta::STREAMS)
                .push(gavf_value::Value::Dictionary(stream));
        }
        footer
    }

    /// Finish the packet stream, write footer, index and tail, flush.
    ///
    /// Returns the track dictionary with the final stats applied, plus
    /// the io for the caller to dispose of.
    pub fn close(mut self) -> Result<(Dictionary, IoStream)> {
        if self.state != State::PktsOpen {
            return Err(Error::InvalidState("close() before start()"));
        }

        if let Some(mut chunk) = self.packets_chunk.take() {
            self.io.chunk_finish(&mut chunk, true)?;
        }

        // Apply the stats to our own track copy, stream for stream:
        // stats sub-dictionary plus the derived metadata fields.
        for (idx, slot) in self.slots.iter().enumerate() {
            let Some(s) = track::get_stream_all_mut(&mut self.track, idx) else {
                continue;
            };
            stream_set_stats(s, &slot.stats);
            match slot.stream_type {
                StreamType::Audio => {
                    let fmt = stream_get_audio_format(s).cloned();
                    let mut m = std::mem::take(track::stream_get_metadata_mut(s));
                    slot.stats.apply_audio(fmt.as_ref(), None, &mut m);
                    *track::stream_get_metadata_mut(s) = m;
                }
                StreamType::Video | StreamType::Overlay => {
                    let mut fmt = stream_get_video_format(s).cloned();
                    let mut m = std::mem::take(track::stream_get_metadata_mut(s));
                    slot.stats.apply_video(fmt.as_mut(), None, &mut m);
                    *track::stream_get_metadata_mut(s) = m;
                    if let Some(fmt) = fmt {
                        track::stream_set_video_format(s, fmt);
                    }
                }
                StreamType::Text => {
                    let mut m = std::mem::take(track::stream_get_metadata_mut(s));
                    slot.stats.apply_subtitle(&mut m);
                    *track::stream_get_metadata_mut(s) = m;
                }
                StreamType::Msg => {}
            }
        }
        track::track_compute_duration(&mut self.track);

        let footer = self.footer();
        let (mut chunk, mut sub) = self.io.chunk_start_io(TAG_FOOTER);
        write_dictionary(&mut sub, &footer)?;
        self.io.chunk_finish_io(&mut chunk, sub)?;

        if let Some(index) = &self.index {
            let (mut chunk, mut sub) = self.io.chunk_start_io(TAG_PACKET_INDEX);
            index.write(&mut sub)?;
            self.io.chunk_finish_io(&mut chunk, sub)?;
        }

        // Tail: tag plus the offset of the tag itself, so a reader can
        // seek here from EOF.
        self.io.align_write()?;
        let tail_start = self.io.position();
        self.io.write_data(TAG_TAIL.as_bytes())?;
        self.io.write_i64_le(tail_start)?;

        self.io.flush()?;
        self.state = State::Done;
        debug!("program closed");
        Ok((self.track, self.io))
    }

    /* Interactive mode */

    /// Poll the back channel for a command from the consumer.
    ///
    /// Only meaningful on duplex ios; handles the message internally
    /// (see [`Writer::handle_command`]) and returns it.
    pub fn poll_command(&mut self, timeout_ms: i32) -> Result<Option<Msg>> {
        if !self.io.is_duplex() {
            return Ok(None);
        }
        if !self.io.can_read(timeout_ms)? {
            return Ok(None);
        }
        let m = Msg::read(&mut self.io)?;
        self.handle_command(&m)?;
        Ok(Some(m))
    }

    /// React to a consumer command, sending the correlated response
    /// downstream where one is defined.
    pub fn handle_command(&mut self, m: &Msg) -> Result<()> {
        match m.get_id() {
            (msg::NS_GENERIC, msg::CMD_QUIT) => {
                self.stopped = true;
            }
            (msg::NS_GENERIC, msg::CMD_PING) => {
                let mut resp = Msg::with_id(msg::NS_GENERIC, msg::MSG_PONG);
                resp.set_resp_for_req(m);
                self.write_message(&resp)?;
            }
            (msg::NS_SRC, msg::CMD_SRC_START) => {
                let mut resp = Msg::with_id(msg::NS_SRC, msg::MSG_SRC_STARTED);
                resp.set_resp_for_req(m);
                resp.set_arg_dictionary(0, self.track.clone());
                self.write_message(&resp)?;
            }
            (msg::NS_SRC, msg::CMD_SRC_PAUSE) => {
                self.paused = true;
            }
            (msg::NS_SRC, msg::CMD_SRC_RESUME) => {
                self.paused = false;
            }
            (msg::NS_SRC, msg::CMD_SRC_SEEK) => {
                let (time, scale) = msg::get_src_seek(m);
                let mut resp = Msg::new();
                msg::set_src_resync(&mut resp, time, scale, true, false);
                resp.set_resp_for_req(m);
                self.write_message(&resp)?;
            }
            (msg::NS_SRC, msg::CMD_SRC_SELECT_TRACK | msg::CMD_SRC_SET_FRAME_STORAGE) => {
                // Acknowledged implicitly; track selection is driven by
                // the application restarting the program.
            }
            (msg::NS_SRC, msg::CMD_SRC_SET_STREAM_ACTION) => {
                let stream_type = m.arg_int(0).unwrap_or(0);
                let idx = m.arg_int(1).unwrap_or(0).max(0) as usize;
                let enable = m.arg_int(2).unwrap_or(0) != 0;
                let mut count = 0usize;
                for slot in &self.slots {
                    if slot.stream_type as u32 == stream_type as u32 {
                        if count == idx {
                            if let Some(s) =
                                track::find_stream_by_id_mut(&mut self.track, slot.id)
                            {
                                track::stream_set_enabled(s, enable);
                            }
                            break;
                        }
                        count += 1;
                    }
                }
            }
            _ => {
                debug!(ns = m.ns, id = m.id, "unhandled command");
            }
        }
        Ok(())
    }

    /// True after the consumer sent a quit command.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
