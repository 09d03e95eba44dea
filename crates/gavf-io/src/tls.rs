//! TLS client streams over TCP sockets.

use std::net::TcpStream;
use std::os::fd::AsRawFd;
use std::sync::Arc;

use rustls::{ClientConfig, ClientConnection, RootCertStore};
use rustls_pki_types::ServerName;
use tracing::debug;

use crate::socket::poll_fd;
use crate::{Backend, Error, IoFlags, IoStream, Result};

fn client_config() -> Result<Arc<ClientConfig>> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for cert in native.certs {
        // Unusable anchors are skipped, not fatal.
        let _ = roots.add(cert);
    }
    if roots.is_empty() {
        return Err(Error::Auth("no usable root certificates".into()));
    }
    Ok(Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    ))
}

fn new_connection(server_name: &str) -> Result<ClientConnection> {
    let name = ServerName::try_from(server_name.to_owned())
        .map_err(|_| Error::Auth(format!("invalid server name: {server_name}")))?;
    Ok(ClientConnection::new(client_config()?, name)?)
}

fn map_tls_error(e: rustls::Error) -> Error {
    match e {
        rustls::Error::InvalidCertificate(reason) => {
            Error::Auth(format!("certificate rejected: {reason:?}"))
        }
        other => Error::Tls(other),
    }
}

struct TlsBackend {
    conn: ClientConnection,
    sock: TcpStream,
}

impl Backend for TlsBackend {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut stream = rustls::Stream::new(&mut self.conn, &mut self.sock);
        match std::io::Read::read(&mut stream, buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut stream = rustls::Stream::new(&mut self.conn, &mut self.sock);
        Ok(std::io::Write::write(&mut stream, buf)?)
    }

    fn flush(&mut self) -> Result<()> {
        let mut stream = rustls::Stream::new(&mut self.conn, &mut self.sock);
        Ok(std::io::Write::flush(&mut stream)?)
    }

    fn poll(&mut self, timeout_ms: i32, write: bool) -> Result<bool> {
        if !write {
            // Decrypted bytes already sitting in the connection count as
            // readable even if the socket itself is idle.
            let state = self.conn.process_new_packets().map_err(map_tls_error)?;
            if state.plaintext_bytes_to_read() > 0 {
                return Ok(true);
            }
        }
        poll_fd(self.sock.as_raw_fd(), timeout_ms, write)
    }

    fn close(&mut self) -> Result<()> {
        self.conn.send_close_notify();
        let mut stream = rustls::Stream::new(&mut self.conn, &mut self.sock);
        let _ = std::io::Write::flush(&mut stream);
        Ok(())
    }
}

fn wrap(conn: ClientConnection, sock: TcpStream) -> IoStream {
    IoStream::new(
        Box::new(TlsBackend { conn, sock }),
        IoFlags::CAN_READ | IoFlags::CAN_WRITE | IoFlags::DUPLEX | IoFlags::SOCKET,
    )
}

/// Open a TLS client over a connected TCP stream, verifying the peer
/// against `server_name`. Blocks until the handshake completes.
pub fn client(mut sock: TcpStream, server_name: &str) -> Result<IoStream> {
    let mut conn = new_connection(server_name)?;
    while conn.is_handshaking() {
        conn.complete_io(&mut sock).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                Error::Auth(format!("tls handshake failed: {e}"))
            } else {
                Error::Io(e)
            }
        })?;
    }
    debug!(server_name, "tls handshake complete");
    Ok(wrap(conn, sock))
}

/// Result of one async handshake step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    /// Call again after the socket becomes ready.
    Pending,
    /// The handshake finished; call [`TlsHandshake::finish`].
    Done,
}

/// An in-flight TLS handshake driven by the caller.
///
/// Dropping it cancels the pending connection.
pub struct TlsHandshake {
    conn: ClientConnection,
    sock: TcpStream,
}

impl TlsHandshake {
    /// Start a handshake over `sock` without blocking.
    pub fn start(sock: TcpStream, server_name: &str) -> Result<Self> {
        sock.set_nonblocking(true)?;
        Ok(Self {
            conn: new_connection(server_name)?,
            sock,
        })
    }

    /// Drive the handshake. Waits up to `timeout_ms` for socket readiness
    /// (0 = try once, negative = wait forever), then performs whatever io
    /// the handshake wants.
    pub fn advance(&mut self, timeout_ms: i32) -> Result<HandshakeStatus> {
        if !self.conn.is_handshaking() {
            return Ok(HandshakeStatus::Done);
        }
        let want_write = self.conn.wants_write();
        if !poll_fd(self.sock.as_raw_fd(), timeout_ms, want_write)? {
            return Ok(HandshakeStatus::Pending);
        }
        match self.conn.complete_io(&mut self.sock) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Ok(HandshakeStatus::Pending);
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(Error::Auth(format!("tls handshake failed: {e}")));
            }
            Err(e) => return Err(Error::Io(e)),
        }
        if self.conn.is_handshaking() {
            Ok(HandshakeStatus::Pending)
        } else {
            Ok(HandshakeStatus::Done)
        }
    }

    /// Turn the completed handshake into a usable stream.
    pub fn finish(self) -> Result<IoStream> {
        if self.conn.is_handshaking() {
            return Err(Error::WouldBlock);
        }
        self.sock.set_nonblocking(false)?;
        Ok(wrap(self.conn, self.sock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_server_name() {
        let err = new_connection("not a hostname").unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
