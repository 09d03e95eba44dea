//! Interactive (streaming) mode over a duplex unix socket pair:
//! commands flow upstream, responses come back as packets on the
//! reserved message stream.

use std::os::unix::net::UnixStream;
use std::time::Duration;

use gavf::msg::{self, Msg};
use gavf::packet::Packet;
use gavf::track::{self, StreamType};
use gavf::transport::{ReadEvent, Reader, Writer, WriterOptions};
use gavf_io::{socket, SocketOptions};
use gavf_value::{AudioFormat, Dictionary, InterleaveMode, SampleFormat};

fn audio_track() -> Dictionary {
    let mut track = Dictionary::new();
    let s = track::append_stream_mut(&mut track, StreamType::Audio);
    let mut fmt = AudioFormat {
        samplerate: 48000,
        num_channels: 1,
        samples_per_frame: 1024,
        sample_format: SampleFormat::S16,
        interleave_mode: InterleaveMode::All,
        ..AudioFormat::default()
    };
    fmt.set_default_channel_setup();
    track::stream_set_audio_format(s, fmt);
    track
}

#[test]
fn ping_pong_and_quit() {
    let (producer_sock, consumer_sock) = UnixStream::pair().unwrap();

    let producer = std::thread::spawn(move || {
        let io = socket::from_unix(producer_sock, SocketOptions::default());
        let mut writer = Writer::new(io, WriterOptions { write_index: false });
        let track = audio_track();
        writer.start(&track).unwrap();
        let id = track::stream_get_id(
            track::get_stream(writer.track(), StreamType::Audio, 0).unwrap(),
        )
        .unwrap();

        let mut pts = 0;
        for _ in 0..200 {
            writer.poll_command(10).unwrap();
            if writer.is_stopped() {
                break;
            }
            if !writer.is_paused() {
                let mut p = Packet::new();
                p.id = id;
                p.pts = pts;
                p.duration = 1024;
                p.set_data(&[0u8; 256]).unwrap();
                writer.write_packet(&p).unwrap();
                pts += 1024;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(writer.is_stopped());
        writer.close().unwrap();
    });

    let io = socket::from_unix(consumer_sock, SocketOptions::default());
    let mut reader = Reader::open(io).unwrap();
    assert_eq!(track::num_streams_all(reader.current_track().unwrap()), 1);

    let mut ping = Msg::with_id(msg::NS_GENERIC, msg::CMD_PING);
    ping.set_client_id("test-client");
    ping.set_context_id("ctx-1");
    reader.send_command(&ping).unwrap();

    let mut got_pong = false;
    let mut packets = 0;
    let mut sent_quit = false;
    loop {
        match reader.next_event() {
            Ok(ReadEvent::Packet(_)) => {
                packets += 1;
                if packets >= 3 && !sent_quit && got_pong {
                    let quit = Msg::with_id(msg::NS_GENERIC, msg::CMD_QUIT);
                    reader.send_command(&quit).unwrap();
                    sent_quit = true;
                }
            }
            Ok(ReadEvent::Message(m)) => {
                if m.matches(msg::NS_GENERIC, msg::MSG_PONG) {
                    // The response is correlated with the request.
                    assert_eq!(m.client_id(), Some("test-client"));
                    assert_eq!(m.context_id(), Some("ctx-1"));
                    got_pong = true;
                }
            }
            Ok(ReadEvent::Eof) | Err(_) => break,
        }
    }

    assert!(got_pong);
    assert!(packets >= 3);
    producer.join().unwrap();
}

#[test]
fn start_command_reports_track() {
    let (producer_sock, consumer_sock) = UnixStream::pair().unwrap();

    let producer = std::thread::spawn(move || {
        let io = socket::from_unix(producer_sock, SocketOptions::default());
        let mut writer = Writer::new(io, WriterOptions { write_index: false });
        writer.start(&audio_track()).unwrap();
        for _ in 0..500 {
            writer.poll_command(10).unwrap();
            if writer.is_stopped() {
                break;
            }
        }
        assert!(writer.is_stopped());
        writer.close().unwrap();
    });

    let io = socket::from_unix(consumer_sock, SocketOptions::default());
    let mut reader = Reader::open(io).unwrap();

    let start = Msg::with_id(msg::NS_SRC, msg::CMD_SRC_START);
    reader.send_command(&start).unwrap();

    let mut started_track = None;
    loop {
        match reader.next_event() {
            Ok(ReadEvent::Message(m)) if m.matches(msg::NS_SRC, msg::MSG_SRC_STARTED) => {
                started_track = m.arg_dictionary(0).cloned();
                let quit = Msg::with_id(msg::NS_GENERIC, msg::CMD_QUIT);
                reader.send_command(&quit).unwrap();
            }
            Ok(ReadEvent::Eof) | Err(_) => break,
            _ => {}
        }
    }

    let started_track = started_track.expect("SRC_STARTED carries the track");
    assert_eq!(track::num_streams_all(&started_track), 1);
    producer.join().unwrap();
}
