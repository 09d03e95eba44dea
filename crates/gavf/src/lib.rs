//! Self-describing chunked A/V container.
//!
//! GAVF is a serialized mirror of the in-memory track structures: a
//! program header chunk carries the track dictionary, a packet chunk the
//! multiplexed compressed packets, and trailing chunks hold per-stream
//! statistics and an optional packet index. The format moves media
//! between processes, over sockets and onto disk; it is not an archival
//! format and its wire layout is not promised stable across versions.
//!
//! The crate layers, bottom up:
//!
//! - [`serialize`]: values and dictionaries on the wire
//! - [`compression`] / [`packet`]: codec identities and packets
//! - [`track`] / [`stats`] / [`edl`]: the media schema over dictionaries
//! - [`msg`]: typed request/response messages
//! - [`transport`]: the chunked container with [`transport::Writer`] and
//!   [`transport::Reader`]
//! - [`urlvars`]: query-parameter helpers for the uri front door

pub mod compression;
pub mod edl;
pub mod meta;
pub mod msg;
pub mod packet;
pub mod serialize;
pub mod stats;
pub mod time;
pub mod track;
pub mod transport;
pub mod urlvars;

mod error;

pub use error::{Error, Result, SinkStatus, SourceStatus};
pub use msg::Msg;
pub use packet::{Packet, PacketFlags};
pub use stats::StreamStats;
pub use track::StreamType;
pub use transport::{ReadEvent, Reader, Writer, WriterOptions};
