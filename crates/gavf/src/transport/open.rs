//! io factory for the GAVF uri schemes.

use std::net::{TcpListener, TcpStream};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use gavf_io::{file, socket, IoStream, SocketOptions};
use tracing::debug;

use crate::transport::{
    EXTENSION, PROTOCOL_TCP, PROTOCOL_TCPSERV, PROTOCOL_UNIX, PROTOCOL_UNIXSERV,
};
use crate::{Error, Result};

fn strip_scheme<'a>(uri: &'a str, scheme: &str) -> Option<&'a str> {
    let rest = uri.strip_prefix(scheme)?;
    let rest = rest.strip_prefix(':')?;
    // Host forms come as scheme://host, path forms as scheme:/path.
    Some(rest.strip_prefix("//").unwrap_or(rest))
}

fn open_socket(uri: &str) -> Result<Option<IoStream>> {
    if let Some(addr) = strip_scheme(uri, PROTOCOL_TCP) {
        debug!(addr, "connecting");
        let stream = TcpStream::connect(addr).map_err(gavf_io::Error::from)?;
        return Ok(Some(socket::from_tcp(stream, SocketOptions::default())));
    }
    if let Some(addr) = strip_scheme(uri, PROTOCOL_TCPSERV) {
        debug!(addr, "waiting for connection");
        let listener = TcpListener::bind(addr).map_err(gavf_io::Error::from)?;
        let (stream, peer) = listener.accept().map_err(gavf_io::Error::from)?;
        debug!(%peer, "accepted");
        return Ok(Some(socket::from_tcp(stream, SocketOptions::default())));
    }
    if let Some(path) = strip_scheme(uri, PROTOCOL_UNIX) {
        let stream = UnixStream::connect(path).map_err(gavf_io::Error::from)?;
        return Ok(Some(socket::from_unix(stream, SocketOptions::default())));
    }
    if let Some(path) = strip_scheme(uri, PROTOCOL_UNIXSERV) {
        let listener = UnixListener::bind(path).map_err(gavf_io::Error::from)?;
        let (stream, _) = listener.accept().map_err(gavf_io::Error::from)?;
        return Ok(Some(socket::from_unix(stream, SocketOptions::default())));
    }
    Ok(None)
}

fn is_gavf_filename(uri: &str) -> bool {
    Path::new(uri)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTENSION))
}

/// Open a uri for reading: `gavf-tcp://`, `gavf-tcpserv://`,
/// `gavf-unix:`, `gavf-unixserv:` or a `.gavf` filename.
pub fn open_uri_read(uri: &str) -> Result<IoStream> {
    if let Some(io) = open_socket(uri)? {
        return Ok(io);
    }
    if is_gavf_filename(uri) {
        return Ok(file::from_filename(Path::new(uri), false)?);
    }
    Err(Error::UnsupportedUri(uri.to_owned()))
}

/// Open a uri for writing; see [`open_uri_read`] for the schemes.
pub fn open_uri_write(uri: &str) -> Result<IoStream> {
    if let Some(io) = open_socket(uri)? {
        return Ok(io);
    }
    if is_gavf_filename(uri) {
        return Ok(file::from_filename(Path::new(uri), true)?);
    }
    Err(Error::UnsupportedUri(uri.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_need_the_extension() {
        assert!(is_gavf_filename("/tmp/movie.gavf"));
        assert!(is_gavf_filename("movie.GAVF"));
        assert!(!is_gavf_filename("/tmp/movie.mp4"));
        assert!(matches!(
            open_uri_read("/nonexistent/movie.mp4"),
            Err(Error::UnsupportedUri(_))
        ));
    }

    #[test]
    fn tcp_pair_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let serv_uri = format!("gavf-tcpserv://127.0.0.1:{port}");
        let client_uri = format!("gavf-tcp://127.0.0.1:{port}");

        let server = std::thread::spawn(move || open_uri_read(&serv_uri).unwrap());
        // Give the listener a moment to bind.
        let mut client = None;
        for _ in 0..50 {
            std::thread::sleep(std::time::Duration::from_millis(10));
            if let Ok(io) = open_uri_write(&client_uri) {
                client = Some(io);
                break;
            }
        }
        let mut client = client.expect("connect");
        let mut server = server.join().unwrap();

        client.write_data(b"ping").unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    }
}
