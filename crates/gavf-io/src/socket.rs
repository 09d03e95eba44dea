//! Socket backed streams.

#![allow(unsafe_code)]

use std::io::{Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

use crate::{Backend, Error, IoFlags, IoStream, Result};

/// poll(2) a raw fd for readiness.
///
/// Negative timeout waits forever, zero tries once without waiting.
pub(crate) fn poll_fd(fd: RawFd, timeout_ms: i32, write: bool) -> Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: if write { libc::POLLOUT } else { libc::POLLIN },
        revents: 0,
    };
    let ret = unsafe { libc::poll(std::ptr::from_mut(&mut pfd), 1, timeout_ms) };
    if ret < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }
    Ok(ret > 0 && (pfd.revents & (pfd.events | libc::POLLHUP | libc::POLLERR)) != 0)
}

/// Options for socket streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketOptions {
    /// Read timeout in milliseconds; 0 means block forever.
    pub read_timeout_ms: i32,
    /// Buffer reads from the socket.
    pub buffer_read: bool,
}

struct SocketBackend<S: Read + Write + AsRawFd> {
    stream: S,
    read_timeout_ms: i32,
    readbuf: Option<Vec<u8>>,
    readbuf_pos: usize,
}

impl<S: Read + Write + AsRawFd> SocketBackend<S> {
    fn fill_readbuf(&mut self) -> Result<()> {
        let Some(buf) = &mut self.readbuf else {
            return Ok(());
        };
        if self.readbuf_pos < buf.len() {
            return Ok(());
        }
        buf.resize(4096, 0);
        let n = self.stream.read(buf)?;
        buf.truncate(n);
        self.readbuf_pos = 0;
        Ok(())
    }

    fn set_nonblocking(&self, on: bool) -> Result<()> {
        let fd = self.stream.as_raw_fd();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        let flags = if on {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl<S: Read + Write + AsRawFd + Send> Backend for SocketBackend<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.read_timeout_ms > 0
            && !poll_fd(self.stream.as_raw_fd(), self.read_timeout_ms, false)?
        {
            return Err(Error::Timeout);
        }
        if self.readbuf.is_some() {
            self.fill_readbuf()?;
            let inner = self.readbuf.as_ref().map_or(&[][..], |b| &b[self.readbuf_pos..]);
            let n = buf.len().min(inner.len());
            buf[..n].copy_from_slice(&inner[..n]);
            self.readbuf_pos += n;
            return Ok(n);
        }
        Ok(self.stream.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.stream.write(buf)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.stream.flush()?)
    }

    fn poll(&mut self, timeout_ms: i32, write: bool) -> Result<bool> {
        if !write
            && self
                .readbuf
                .as_ref()
                .is_some_and(|b| self.readbuf_pos < b.len())
        {
            return Ok(true);
        }
        poll_fd(self.stream.as_raw_fd(), timeout_ms, write)
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.poll(0, false)? {
            return Err(Error::WouldBlock);
        }
        self.set_nonblocking(true)?;
        let res = self.stream.read(buf);
        self.set_nonblocking(false)?;
        match res {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(Error::WouldBlock),
            Err(e) => Err(e.into()),
        }
    }

    fn write_nonblock(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.poll(0, true)? {
            return Err(Error::WouldBlock);
        }
        self.set_nonblocking(true)?;
        let res = self.stream.write(buf);
        self.set_nonblocking(false)?;
        match res {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(Error::WouldBlock),
            Err(e) => Err(e.into()),
        }
    }
}

fn socket_flags(unix: bool) -> IoFlags {
    let mut flags =
        IoFlags::CAN_READ | IoFlags::CAN_WRITE | IoFlags::DUPLEX | IoFlags::SOCKET;
    if unix {
        flags.insert(IoFlags::UNIX_SOCKET | IoFlags::LOCAL);
    }
    flags
}

/// Wrap a connected TCP stream.
pub fn from_tcp(stream: TcpStream, opts: SocketOptions) -> IoStream {
    IoStream::new(
        Box::new(SocketBackend {
            stream,
            read_timeout_ms: opts.read_timeout_ms,
            readbuf: opts.buffer_read.then(Vec::new),
            readbuf_pos: 0,
        }),
        socket_flags(false),
    )
}

/// Wrap a connected Unix domain stream.
pub fn from_unix(stream: UnixStream, opts: SocketOptions) -> IoStream {
    IoStream::new(
        Box::new(SocketBackend {
            stream,
            read_timeout_ms: opts.read_timeout_ms,
            readbuf: opts.buffer_read.then(Vec::new),
            readbuf_pos: 0,
        }),
        socket_flags(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            conn.read_exact(&mut buf).unwrap();
            conn.write_all(&buf).unwrap();
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut io = from_tcp(stream, SocketOptions::default());
        assert!(io.is_duplex());
        io.write_data(b"hello").unwrap();
        let mut out = [0u8; 5];
        io.read_exact(&mut out).unwrap();
        assert_eq!(&out, b"hello");
        handle.join().unwrap();
    }

    #[test]
    fn unix_socket_flags() {
        let (a, _b) = UnixStream::pair().unwrap();
        let io = from_unix(a, SocketOptions::default());
        assert!(io.flags().contains(IoFlags::UNIX_SOCKET));
        assert!(io.flags().contains(IoFlags::LOCAL));
    }

    #[test]
    fn poll_reports_pending_data() {
        let (a, mut b) = UnixStream::pair().unwrap();
        let mut io = from_unix(a, SocketOptions::default());
        assert!(!io.can_read(0).unwrap());
        b.write_all(b"x").unwrap();
        assert!(io.can_read(1000).unwrap());
    }
}
