use std::io::{Read, Write};

use crate::error::Result;
use crate::tcp::{read_chunk_retrying, write_all_retrying};
use crate::traits::{ByteStream, ReadOutcome, DEFAULT_CHUNK_SIZE};

/// Generic [`ByteStream`] adapter over any `Read + Write` stream.
///
/// Useful for socket pairs, pipes, pseudo-terminals, or serial handles
/// that expose plain blocking I/O. Reads that fail with `WouldBlock` or
/// `TimedOut` are reported as [`ReadOutcome::TimedOut`]; a zero-length
/// read is reported as [`ReadOutcome::Closed`].
///
/// A small chunk size (down to 1) is useful for low-bandwidth or bursty
/// streams where waiting to fill a large buffer would stall decoding.
pub struct IoByteStream<T> {
    inner: T,
    chunk_size: usize,
}

impl<T: Read + Write> IoByteStream<T> {
    /// Wrap a stream with the default chunk size.
    pub fn new(inner: T) -> Self {
        Self::with_chunk_size(inner, DEFAULT_CHUNK_SIZE)
    }

    /// Wrap a stream with an explicit per-read chunk size.
    pub fn with_chunk_size(inner: T, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> ByteStream for IoByteStream<T> {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        write_all_retrying(&mut self.inner, packet)
    }

    fn read_chunk(&mut self) -> Result<ReadOutcome> {
        read_chunk_retrying(&mut self.inner, self.chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::*;

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = IoByteStream::new(left);
        let mut reader = IoByteStream::new(right);

        writer.write_packet(b"\xc0ping\xc0").unwrap();
        drop(writer);

        match reader.read_chunk().unwrap() {
            ReadOutcome::Data(chunk) => assert_eq!(chunk.as_ref(), b"\xc0ping\xc0"),
            other => panic!("expected data, got {other:?}"),
        }
        assert!(matches!(reader.read_chunk().unwrap(), ReadOutcome::Closed));
    }

    #[test]
    fn chunk_size_limits_read() {
        let stream = ScriptedIo {
            readable: b"abcdef".to_vec(),
            pos: 0,
        };
        let mut adapter = IoByteStream::with_chunk_size(stream, 2);

        match adapter.read_chunk().unwrap() {
            ReadOutcome::Data(chunk) => assert_eq!(chunk.as_ref(), b"ab"),
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[test]
    fn would_block_maps_to_timeout() {
        let mut adapter = IoByteStream::new(WouldBlockIo);
        assert!(matches!(adapter.read_chunk().unwrap(), ReadOutcome::TimedOut));
    }

    #[test]
    fn empty_read_maps_to_closed() {
        let stream = ScriptedIo {
            readable: Vec::new(),
            pos: 0,
        };
        let mut adapter = IoByteStream::new(stream);
        assert!(matches!(adapter.read_chunk().unwrap(), ReadOutcome::Closed));
    }

    struct ScriptedIo {
        readable: Vec<u8>,
        pos: usize,
    }

    impl Read for ScriptedIo {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let remaining = &self.readable[self.pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Write for ScriptedIo {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct WouldBlockIo;

    impl Read for WouldBlockIo {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }

    impl Write for WouldBlockIo {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
