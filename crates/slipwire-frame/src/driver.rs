use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::{self, END};
use crate::error::Result;

/// How long a started frame may take to complete before the decoder
/// assumes its closing delimiter was lost and resynchronizes.
///
/// Without this, a single corrupted `END` byte would flip the frame
/// state machine permanently out of phase with the sender.
pub const FRAME_COMPLETION_TIMEOUT: Duration = Duration::from_secs(1);

/// Incremental SLIP frame decoder.
///
/// Consumes arbitrarily fragmented byte chunks, extracts complete
/// frames by delimiter scanning, and decodes them into messages.
/// Framing itself never fails; only decoding a completed packet can,
/// and that failure is recoverable per packet (see
/// [`take_recovered`](Self::take_recovered) and [`flush`](Self::flush)).
///
/// One `Driver` is created per stream and lives for the stream's
/// lifetime. It is not internally synchronized.
pub struct Driver {
    /// Completed frames, not yet decoded.
    packets: VecDeque<Bytes>,
    /// Messages decoded before the most recent decode error.
    recovered: Vec<Bytes>,
    /// In-progress frame; present iff a frame start has been seen but
    /// the frame has not yet been closed.
    frame: Option<BytesMut>,
    /// Deadline for completing the in-progress frame.
    deadline: Option<Instant>,
    completion_timeout: Duration,
}

impl Driver {
    /// Create a driver with the default frame completion timeout.
    pub fn new() -> Self {
        Self::with_completion_timeout(FRAME_COMPLETION_TIMEOUT)
    }

    /// Create a driver with an explicit frame completion timeout.
    pub fn with_completion_timeout(completion_timeout: Duration) -> Self {
        Self {
            packets: VecDeque::new(),
            recovered: Vec::new(),
            frame: None,
            deadline: None,
            completion_timeout,
        }
    }

    /// Encode a message into a SLIP packet for transmission.
    ///
    /// Stateless; provided for symmetry with [`receive`](Self::receive).
    pub fn send(&self, message: &[u8]) -> Bytes {
        codec::encode(message)
    }

    /// Feed a chunk of received bytes and return newly decoded messages.
    ///
    /// The chunk may be empty, a single byte, or many packets at once;
    /// an incomplete trailing frame is carried over to the next call.
    /// An empty chunk performs no scanning and merely drains the queue
    /// of completed packets, like [`flush`](Self::flush).
    ///
    /// # Errors
    ///
    /// Returns [`SlipError::Protocol`](crate::SlipError::Protocol) when
    /// a completed packet contains an invalid byte sequence. Messages
    /// decoded earlier in the same call are retained and retrievable
    /// via [`take_recovered`](Self::take_recovered); packets queued
    /// behind the invalid one are decoded by a subsequent
    /// [`flush`](Self::flush) or [`receive`](Self::receive).
    pub fn receive(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        for &byte in data {
            if byte == END {
                self.handle_delimiter();
            } else if let Some(frame) = self.frame.as_mut() {
                frame.put_u8(byte);
            } else {
                // Out-of-frame noise (line garbage between packets).
                trace!(byte, "discarding out-of-frame byte");
            }
        }
        self.flush()
    }

    fn handle_delimiter(&mut self) {
        let now = Instant::now();
        match self.frame.take() {
            None => {
                // A frame has started.
                self.frame = Some(BytesMut::new());
                self.deadline = Some(now + self.completion_timeout);
            }
            Some(frame) => {
                if self.deadline.is_some_and(|deadline| now > deadline) {
                    // The frame took too long to complete. Assume its
                    // closing END was lost or corrupted and treat this
                    // byte as the opener of a new frame.
                    debug!(
                        stale_bytes = frame.len(),
                        "frame completion timeout exceeded; resynchronizing"
                    );
                    self.frame = Some(BytesMut::new());
                    self.deadline = Some(now + self.completion_timeout);
                } else if frame.is_empty() {
                    // Adjacent delimiters carry no payload. Absorb them
                    // so that delimiter runs never produce zero-length
                    // messages, keeping the empty message free to mean
                    // end-of-stream at the session layer.
                    self.frame = Some(frame);
                    self.deadline = Some(now + self.completion_timeout);
                } else {
                    // A frame has ended.
                    self.packets.push_back(frame.freeze());
                    self.deadline = None;
                }
            }
        }
    }

    /// Decode and return all queued complete packets.
    ///
    /// Does not touch the receive state; used to resume decoding after
    /// a protocol error has been handled.
    ///
    /// # Errors
    ///
    /// Same per-packet semantics as [`receive`](Self::receive).
    pub fn flush(&mut self) -> Result<Vec<Bytes>> {
        let mut messages = Vec::new();
        while let Some(packet) = self.packets.pop_front() {
            match codec::decode(&packet) {
                Ok(msg) => messages.push(msg),
                Err(err) => {
                    self.recovered = messages;
                    return Err(err);
                }
            }
        }
        Ok(messages)
    }

    /// Take the messages that were decoded before the most recent
    /// protocol error.
    ///
    /// Single-use: the internal list is cleared on read, so a repeated
    /// call returns nothing until the next error occurs.
    pub fn take_recovered(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.recovered)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}
