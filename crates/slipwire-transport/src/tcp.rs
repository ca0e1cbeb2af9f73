use std::fmt::Display;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ByteStream, ReadOutcome, DEFAULT_CHUNK_SIZE};

/// TCP adapter implementing the [`ByteStream`] contract.
///
/// Reads report [`ReadOutcome::TimedOut`] when the socket's read
/// timeout elapses (see [`set_read_timeout`](Self::set_read_timeout)),
/// and [`ReadOutcome::Closed`] when the peer shuts the connection down.
pub struct TcpByteStream {
    inner: TcpStream,
    chunk_size: usize,
}

impl TcpByteStream {
    /// Connect to a listening peer (blocking).
    pub fn connect<A: ToSocketAddrs + Display>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(&addr).map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;
        debug!(addr = %addr, "connected to tcp peer");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already connected `TcpStream`.
    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            inner: stream,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the number of bytes requested per read operation.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    /// Set the read timeout on the underlying socket.
    ///
    /// With a timeout in place, [`ByteStream::read_chunk`] reports
    /// [`ReadOutcome::TimedOut`] instead of blocking indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Into::into)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &TcpStream {
        &self.inner
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> TcpStream {
        self.inner
    }
}

impl ByteStream for TcpByteStream {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        write_all_retrying(&mut self.inner, packet)
    }

    fn read_chunk(&mut self) -> Result<ReadOutcome> {
        read_chunk_retrying(&mut self.inner, self.chunk_size)
    }
}

impl std::fmt::Debug for TcpByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpByteStream")
            .field("peer", &self.inner.peer_addr().ok())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

/// TCP listener yielding connected [`TcpByteStream`]s.
pub struct SlipListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl SlipListener {
    /// Bind and listen on a TCP address.
    pub fn bind<A: ToSocketAddrs + Display>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(&addr).map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        let addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        info!(%addr, "listening for slip connections");
        Ok(Self { listener, addr })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<TcpByteStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok(TcpByteStream::from_stream(stream))
    }

    /// The local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

pub(crate) fn write_all_retrying<W: Write>(writer: &mut W, packet: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < packet.len() {
        match writer.write(&packet[offset..]) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

pub(crate) fn read_chunk_retrying<R: Read>(reader: &mut R, chunk_size: usize) -> Result<ReadOutcome> {
    let mut chunk = vec![0u8; chunk_size];
    loop {
        return match reader.read(&mut chunk) {
            Ok(0) => Ok(ReadOutcome::Closed),
            Ok(n) => Ok(ReadOutcome::Data(Bytes::copy_from_slice(&chunk[..n]))),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(ReadOutcome::TimedOut),
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(ReadOutcome::TimedOut),
            Err(err) => Err(TransportError::Io(err)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_accept_connect_roundtrip() {
        let listener = SlipListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();

        let handle = std::thread::spawn(move || {
            let mut client = TcpByteStream::connect(addr).unwrap();
            client.write_packet(b"\xc0hello\xc0").unwrap();
        });

        let mut server = listener.accept().unwrap();
        match server.read_chunk().unwrap() {
            ReadOutcome::Data(chunk) => assert_eq!(chunk.as_ref(), b"\xc0hello\xc0"),
            other => panic!("expected data, got {other:?}"),
        }

        handle.join().unwrap();
    }

    #[test]
    fn read_reports_timeout() {
        let listener = SlipListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();

        let handle = std::thread::spawn(move || {
            let client = TcpByteStream::connect(addr).unwrap();
            // Keep the connection open long enough for the server read
            // to hit its deadline.
            std::thread::sleep(Duration::from_millis(100));
            drop(client);
        });

        let mut server = listener.accept().unwrap();
        server
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        assert!(matches!(server.read_chunk().unwrap(), ReadOutcome::TimedOut));

        handle.join().unwrap();
    }

    #[test]
    fn read_reports_close() {
        let listener = SlipListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();

        let handle = std::thread::spawn(move || {
            let client = TcpByteStream::connect(addr).unwrap();
            drop(client);
        });

        let mut server = listener.accept().unwrap();
        handle.join().unwrap();
        assert!(matches!(server.read_chunk().unwrap(), ReadOutcome::Closed));
    }

    #[test]
    fn connect_to_unbound_port_fails() {
        // Bind then drop to get a port that is very likely unbound.
        let listener = SlipListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();
        drop(listener);

        let result = TcpByteStream::connect(addr);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn small_chunk_size_still_delivers_everything() {
        let listener = SlipListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();

        let handle = std::thread::spawn(move || {
            let mut client = TcpByteStream::connect(addr).unwrap();
            client.write_packet(b"abcdef").unwrap();
        });

        let mut server = listener.accept().unwrap();
        server.set_chunk_size(1);
        handle.join().unwrap();

        let mut collected = Vec::new();
        loop {
            match server.read_chunk().unwrap() {
                ReadOutcome::Data(chunk) => {
                    assert_eq!(chunk.len(), 1);
                    collected.extend_from_slice(&chunk);
                }
                ReadOutcome::Closed => break,
                ReadOutcome::TimedOut => panic!("unexpected timeout"),
            }
        }
        assert_eq!(collected, b"abcdef");
    }
}
