//! The GAVF transport: a chunked container carrying a program header,
//! a multiplexed packet stream, a packet index and a footer.
//!
//! Top-level layout (each chunk 8-byte aligned, see [`gavf_io::Chunk`]):
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `GAVFPHDR` | serialized track dictionary |
//! | `GAVFPEND` | program end marker for multi-program streams |
//! | `GAVFPKTS` | multiplexed packet stream |
//! | `GAVFPIDX` | serialized packet index |
//! | `GAVFFOOT` | footer dictionary with per-stream stats |
//! | `GAVFTAIL` | offset of this chunk, for reverse seeks from EOF |
//!
//! Concatenating two files with `cat` yields a valid multi-program file.

mod open;
mod packet_index;
mod packets;
mod reader;
mod writer;

pub use open::{open_uri_read, open_uri_write};
pub use packet_index::{IndexEntry, PacketIndex};
pub use packets::{read_packet, write_packet, PACKET_MARKER};
pub use reader::{ReadEvent, Reader};
pub use writer::{Writer, WriterOptions};

pub const TAG_PROGRAM_HEADER: &str = "GAVFPHDR";
pub const TAG_PROGRAM_END: &str = "GAVFPEND";
pub const TAG_PACKETS: &str = "GAVFPKTS";
pub const TAG_PACKET_INDEX: &str = "GAVFPIDX";
pub const TAG_FOOTER: &str = "GAVFFOOT";
pub const TAG_TAIL: &str = "GAVFTAIL";

/* URI schemes of the io factory */
pub const PROTOCOL_TCP: &str = "gavf-tcp";
pub const PROTOCOL_TCPSERV: &str = "gavf-tcpserv";
pub const PROTOCOL_UNIX: &str = "gavf-unix";
pub const PROTOCOL_UNIXSERV: &str = "gavf-unixserv";
/// Filename extension of on-disk files.
pub const EXTENSION: &str = "gavf";
