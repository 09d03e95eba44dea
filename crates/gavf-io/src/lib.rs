//! Polymorphic byte-stream layer for the GAVF media container.
//!
//! An [`IoStream`] wraps a [`Backend`] (file, memory, socket, TLS, cipher,
//! sub-stream) behind one object with capability flags, sticky EOF/error
//! state, position tracking and pushback. On top of it sit the wire
//! primitives (fixed-width integers, varints, floats, length-prefixed
//! strings) and the chunk framing used by the container.
//!
//! The layer is single-threaded and blocking: any read, write or poll on a
//! descriptor-backed stream may suspend the caller, everything else is
//! purely computational. Non-blocking variants and the async TLS handshake
//! exist for callers that drive their own readiness loop.

pub mod chunk;
pub mod cipher;
pub mod file;
pub mod mem;
pub mod socket;
pub mod tls;

mod error;
mod io;
mod primitives;
mod sub;

pub use chunk::Chunk;
pub use error::{Error, Result};
pub use io::{Backend, IoFlags, IoStream};
pub use socket::SocketOptions;
pub use tls::{HandshakeStatus, TlsHandshake};
