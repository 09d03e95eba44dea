//! End-to-end container tests: write a multiplexed file, read it back,
//! seek in it, survive truncation and concatenation.

use gavf::packet::{Packet, PacketFlags};
use gavf::track::{self, StreamType};
use gavf::transport::{Reader, Writer, WriterOptions};
use gavf::SinkStatus;
use gavf_io::IoStream;
use gavf_value::{
    AudioFormat, Dictionary, FramerateMode, InterlaceMode, InterleaveMode, PixelFormat,
    SampleFormat, VideoFormat,
};
use pretty_assertions::assert_eq;

fn audio_format() -> AudioFormat {
    let mut fmt = AudioFormat {
        samplerate: 48000,
        num_channels: 2,
        samples_per_frame: 1024,
        sample_format: SampleFormat::S16,
        interleave_mode: InterleaveMode::All,
        ..AudioFormat::default()
    };
    fmt.set_default_channel_setup();
    fmt
}

fn video_format() -> VideoFormat {
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

fn test_track() -> Dictionary {
    let mut track = Dictionary::new();
    let s = track::append_stream_mut(&mut track, StreamType::Audio);
    track::stream_set_audio_format(s, audio_format());
    let s = track::append_stream_mut(&mut track, StreamType::Video);
    track::stream_set_video_format(s, video_format());
    track
}

/// Write 10 audio packets (pts 0, 1024, ..., 1024 samples, 4096 bytes,
/// all keyframes) and 10 video packets (pts 0..9, duration 1, 1000
/// bytes, keyframes at 0 and 5), interleaved.
fn write_test_file(io: IoStream) -> (Dictionary, IoStream) {
    let mut writer = Writer::new(io, WriterOptions::default());
    let track = test_track();
    writer.start(&track).unwrap();

    let audio_id =
        track::stream_get_id(track::get_stream(writer.track(), StreamType::Audio, 0).unwrap())
            .unwrap();
    let video_id =
        track::stream_get_id(track::get_stream(writer.track(), StreamType::Video, 0).unwrap())
            .unwrap();

    for i in 0..10i64 {
        let mut a = Packet::new();
        a.id = audio_id;
        a.pts = i * 1024;
        a.duration = 1024;
        a.flags = PacketFlags::KEYFRAME;
        a.set_data(&vec![0x55u8; 4096]).unwrap();
        assert_eq!(writer.write_packet(&a).unwrap(), SinkStatus::Ok);

        let mut v = Packet::new();
        v.id = video_id;
        v.pts = i;
        v.duration = 1;
        if i == 0 || i == 5 {
            v.flags = PacketFlags::KEYFRAME;
        }
        v.set_data(&vec![0xaau8; 1000]).unwrap();
        assert_eq!(writer.write_packet(&v).unwrap(), SinkStatus::Ok);
    }

    writer.close().unwrap()
}

fn stream_ids(track: &Dictionary) -> (i32, i32) {
    (
        track::stream_get_id(track::get_stream(track, StreamType::Audio, 0).unwrap()).unwrap(),
        track::stream_get_id(track::get_stream(track, StreamType::Video, 0).unwrap()).unwrap(),
    )
}

#[test]
fn round_trip_two_streams() {
    let (written_track, mut io) = write_test_file(gavf_io::mem::write());
    let data = io.take_buffer().unwrap().into_vec();

    let mut reader = Reader::open(gavf_io::mem::read(data)).unwrap();
    let read_track = reader.current_track().unwrap().clone();
    assert_eq!(track::num_streams_all(&read_track), 2);
    let (audio_id, video_id) = stream_ids(&read_track);

    let mut audio_packets = Vec::new();
    let mut video_packets = Vec::new();
    while let Some(p) = reader.next_packet().unwrap() {
        if p.id == audio_id {
            audio_packets.push(p);
        } else if p.id == video_id {
            video_packets.push(p);
        } else {
            panic!("unexpected stream id {}", p.id);
        }
    }
    assert_eq!(audio_packets.len(), 10);
    assert_eq!(video_packets.len(), 10);

    // Payloads and timing survive.
    for (i, p) in audio_packets.iter().enumerate() {
        assert_eq!(p.pts, i as i64 * 1024);
        assert_eq!(p.duration, 1024);
        assert_eq!(p.data_len(), 4096);
        assert!(p.flags.contains(PacketFlags::KEYFRAME));
    }
    for (i, p) in video_packets.iter().enumerate() {
        assert_eq!(p.pts, i as i64);
        assert_eq!(p.duration, 1);
        assert_eq!(p.data_len(), 1000);
        assert_eq!(
            p.flags.contains(PacketFlags::KEYFRAME),
            i == 0 || i == 5
        );
    }

    // The footer was merged: the reader's stats match the writer's.
    let final_track = reader.current_track().unwrap();
    for idx in 0..2 {
        let written = track::get_stream_all(&written_track, idx).unwrap();
        let read = track::get_stream_all(final_track, idx).unwrap();
        assert_eq!(
            track::stream_get_stats(read).unwrap(),
            track::stream_get_stats(written).unwrap()
        );
    }

    let audio_stats =
        track::stream_get_stats(track::get_stream_all(final_track, 0).unwrap()).unwrap();
    assert_eq!(audio_stats.pts_start, 0);
    assert_eq!(audio_stats.pts_end, 10240);
    assert_eq!(audio_stats.total_packets, 10);
    assert_eq!(audio_stats.total_bytes, 40960);

    let video_stats =
        track::stream_get_stats(track::get_stream_all(final_track, 1).unwrap()).unwrap();
    assert_eq!(video_stats.pts_start, 0);
    assert_eq!(video_stats.pts_end, 10);
}

#[test]
fn seek_snaps_to_keyframes() {
    let (_, mut io) = write_test_file(gavf_io::mem::write());
    let data = io.take_buffer().unwrap().into_vec();

    let mut reader = Reader::open(gavf_io::mem::read(data)).unwrap();
    let (_, video_id) = stream_ids(&reader.current_track().unwrap().clone());

    // Seek to t=4 in video timescale: the nearest keyframe at or before
    // pts 4 is pts 0.
    let sync = reader.seek(4, 25).unwrap().expect("index available");
    let video_sync = sync.iter().find(|(id, _)| *id == video_id).unwrap().1;
    assert_eq!(video_sync, 0);

    // pts 5 is itself a keyframe.
    let sync = reader.seek(5, 25).unwrap().unwrap();
    let video_sync = sync.iter().find(|(id, _)| *id == video_id).unwrap().1;
    assert_eq!(video_sync, 5);

    // Reading resumes at the seek position.
    let p = reader.next_packet().unwrap().expect("packet after seek");
    assert!(p.pts >= 0);
}

#[test]
fn on_disk_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.gavf");

    let io = gavf_io::file::from_filename(&path, true).unwrap();
    let (_, io_back) = write_test_file(io);
    io_back.close().unwrap();

    let io = gavf_io::file::from_filename(&path, false).unwrap();
    let mut reader = Reader::open(io).unwrap();
    let mut count = 0;
    while reader.next_packet().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 20);

    // Seek works on the reopened file via the trailing index.
    let io = gavf_io::file::from_filename(&path, false).unwrap();
    let mut reader = Reader::open(io).unwrap();
    assert!(reader.seek(0, 25).unwrap().is_some());
}

#[test]
fn unknown_chunk_length_reads_to_eof() {
    // A non-seekable sink cannot patch chunk lengths; the packets chunk
    // stays at length 0 and the reader parses to the trailing chunks.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.gavf");

    let file = std::fs::File::create(&path).unwrap();
    let io = gavf_io::file::from_file(file, true, false);
    assert!(!io.can_seek());
    let (_, io_back) = write_test_file(io);
    io_back.close().unwrap();

    let io = gavf_io::file::from_filename(&path, false).unwrap();
    let mut reader = Reader::open(io).unwrap();
    let mut count = 0;
    while reader.next_packet().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 20);
    // The footer still arrived.
    let track = reader.current_track().unwrap();
    assert!(track::stream_get_stats(track::get_stream_all(track, 0).unwrap()).is_some());
}

#[test]
fn truncated_file_yields_packets_without_stats() {
    let (_, mut io) = write_test_file(gavf_io::mem::write());
    let mut data = io.take_buffer().unwrap().into_vec();

    // Cut the file in the middle of the packet stream.
    data.truncate(data.len() * 2 / 3);

    let mut reader = Reader::open(gavf_io::mem::read(data)).unwrap();
    let mut count = 0;
    loop {
        match reader.next_packet() {
            Ok(Some(_)) => count += 1,
            Ok(None) => break,
            // A frame cut in half surfaces as an error; everything up to
            // it was delivered.
            Err(_) => break,
        }
    }
    assert!(count > 0);
    assert!(count < 20);

    // No footer, no stats.
    let track = reader.current_track().unwrap();
    assert!(track::stream_get_stats(track::get_stream_all(track, 0).unwrap()).is_none());
}

#[test]
fn concatenated_files_are_multi_program() {
    let (_, mut io) = write_test_file(gavf_io::mem::write());
    let mut data = io.take_buffer().unwrap().into_vec();
    let (_, mut io) = write_test_file(gavf_io::mem::write());
    data.extend_from_slice(io.take_buffer().unwrap().as_slice());

    let mut reader = Reader::open(gavf_io::mem::read(data)).unwrap();
    let mut count = 0;
    while reader.next_packet().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 40);
    assert_eq!(track::num_tracks(reader.media_info()), 2);
}

#[test]
fn writer_rejects_unknown_stream_ids() {
    let mut writer = Writer::new(gavf_io::mem::write(), WriterOptions::default());
    writer.start(&test_track()).unwrap();
    let mut p = Packet::new();
    p.id = 1234;
    p.set_data(b"x").unwrap();
    assert!(matches!(
        writer.write_packet(&p),
        Err(gavf::Error::UnknownStream(1234))
    ));
}

#[test]
fn track_duration_is_derived_from_stats() {
    let (track, _) = write_test_file(gavf_io::mem::write());
    // Audio: 10240 samples at 48 kHz is ~213 ms; video: 10 frames at
    // 25 fps is 400 ms. The track spans the longest stream.
    let duration = track::track_get_duration(&track);
    assert_eq!(duration, 400_000);
}
