use bytes::Bytes;

use crate::error::Result;

/// Default number of bytes requested per read operation.
///
/// Adapters accept a smaller chunk size for low-bandwidth or bursty
/// transports (e.g. a serial line read one byte at a time).
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Outcome of a single read from a byte stream.
///
/// A read that produced no data is ambiguous on most transports: the
/// stream may have hit its read deadline, or the peer may have closed
/// the connection. Adapters must resolve that ambiguity and report it
/// explicitly, so callers never have to guess from an empty buffer.
#[derive(Debug)]
pub enum ReadOutcome {
    /// One or more bytes arrived.
    Data(Bytes),
    /// The read deadline elapsed before any data arrived; the stream
    /// is still open and a later read may succeed.
    TimedOut,
    /// The peer closed the stream; no further data will arrive.
    Closed,
}

/// Blocking byte-stream contract consumed by the SLIP session layer.
///
/// Implementations wrap a concrete transport (TCP socket, socket pair,
/// serial handle) and are responsible only for moving raw bytes; frame
/// boundaries and escaping are handled entirely above this trait.
pub trait ByteStream {
    /// Write an entire packet, blocking until the transport has
    /// accepted all of it.
    fn write_packet(&mut self, packet: &[u8]) -> Result<()>;

    /// Read the next chunk of bytes, blocking until data arrives, the
    /// read deadline elapses, or the stream is closed.
    fn read_chunk(&mut self) -> Result<ReadOutcome>;
}
