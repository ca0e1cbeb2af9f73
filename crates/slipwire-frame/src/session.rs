use std::collections::VecDeque;

use bytes::Bytes;
use slipwire_transport::{ByteStream, ReadOutcome, TcpByteStream};
use tracing::{debug, trace};

use crate::driver::Driver;
use crate::error::{Result, SlipError};

/// Error-recovery state of a session.
///
/// A protocol error is not surfaced at the moment it occurs: messages
/// decoded before the bad packet are delivered first, then the error is
/// raised, then decoding resumes behind the bad packet. Modeling the
/// three phases explicitly keeps the interleavings testable.
enum Recovery {
    /// No error outstanding.
    Normal,
    /// An error was captured and must be raised on the next receive
    /// call that finds no queued message.
    ErrorPending(SlipError),
    /// The error has been raised; the driver's packet queue must be
    /// drained before reading from the stream again, so messages queued
    /// behind the bad packet are not lost.
    FlushPending,
}

/// Message-oriented session over a byte stream.
///
/// Combines a [`Driver`] with any [`ByteStream`] to send and receive
/// whole SLIP messages. The session owns the driver and the stream
/// handle; opening and closing the underlying transport remains the
/// caller's responsibility.
///
/// Receiving an empty message means the stream was closed by the peer
/// and no further messages will arrive. Zero-length messages never
/// occur otherwise: the driver absorbs empty frames.
pub struct SlipSession<S> {
    stream: S,
    driver: Driver,
    queued: VecDeque<Bytes>,
    recovery: Recovery,
    stream_closed: bool,
}

impl<S: ByteStream> SlipSession<S> {
    /// Wrap a byte stream in a message session.
    pub fn new(stream: S) -> Self {
        Self::with_driver(stream, Driver::new())
    }

    /// Wrap a byte stream using an explicitly configured driver.
    pub fn with_driver(stream: S, driver: Driver) -> Self {
        Self {
            stream,
            driver,
            queued: VecDeque::new(),
            recovery: Recovery::Normal,
            stream_closed: false,
        }
    }

    /// Encode a message and write the resulting packet to the stream.
    pub fn send_msg(&mut self, message: &[u8]) -> Result<()> {
        let packet = self.driver.send(message);
        self.stream.write_packet(&packet)?;
        Ok(())
    }

    /// Receive the next message from the stream.
    ///
    /// Blocks until a message is available or the stream is closed.
    /// Returns an empty message once the stream is permanently closed
    /// and no buffered messages remain. A read timeout on the stream
    /// keeps it open; the session simply retries.
    ///
    /// # Errors
    ///
    /// Returns [`SlipError::Protocol`] when a received packet contains
    /// an invalid byte sequence. After the caller has handled the
    /// error, the next call resumes exactly where decoding left off:
    /// no message is lost and none is delivered twice.
    pub fn recv_msg(&mut self) -> Result<Bytes> {
        if let Some(msg) = self.queued.pop_front() {
            return Ok(msg);
        }
        self.raise_pending()?;

        while self.queued.is_empty() && !self.stream_closed {
            if matches!(self.recovery, Recovery::FlushPending) {
                self.recovery = Recovery::Normal;
                match self.driver.flush() {
                    Ok(messages) => self.queued.extend(messages),
                    Err(err) => {
                        self.capture(err);
                        break;
                    }
                }
            } else {
                match self.stream.read_chunk()? {
                    ReadOutcome::Data(chunk) => match self.driver.receive(&chunk) {
                        Ok(messages) => self.queued.extend(messages),
                        Err(err) => {
                            self.capture(err);
                            break;
                        }
                    },
                    ReadOutcome::TimedOut => {
                        trace!("read timed out; retrying");
                    }
                    ReadOutcome::Closed => {
                        debug!("stream closed by peer");
                        self.stream_closed = true;
                    }
                }
            }
        }

        if let Some(msg) = self.queued.pop_front() {
            return Ok(msg);
        }
        self.raise_pending()?;
        Ok(Bytes::new())
    }

    /// Lazily iterate over received messages.
    ///
    /// The iterator is finite and non-restartable: it ends the first
    /// time the stream reports a permanent close. Protocol errors do
    /// not end it; they are yielded as `Err` items and iteration
    /// continues with the messages behind the bad packet.
    pub fn messages(&mut self) -> Messages<'_, S> {
        Messages {
            session: self,
            done: false,
        }
    }

    /// Raise a captured protocol error, scheduling a driver flush so
    /// the packets queued behind the bad one are decoded next.
    fn raise_pending(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.recovery, Recovery::Normal) {
            Recovery::ErrorPending(err) => {
                self.recovery = Recovery::FlushPending;
                Err(err)
            }
            other => {
                self.recovery = other;
                Ok(())
            }
        }
    }

    fn capture(&mut self, err: SlipError) {
        self.queued.extend(self.driver.take_recovered());
        self.recovery = Recovery::ErrorPending(err);
    }

    /// Borrow the session's driver.
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Mutably borrow the underlying stream.
    ///
    /// Reading from or writing to the stream directly invalidates the
    /// session's framing state; use with care.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consume the session and return the inner stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl SlipSession<TcpByteStream> {
    /// Connect to a TCP peer and wrap the connection in a session.
    pub fn connect<A>(addr: A) -> Result<Self>
    where
        A: std::net::ToSocketAddrs + std::fmt::Display,
    {
        let stream = TcpByteStream::connect(addr)?;
        Ok(Self::new(stream))
    }
}

/// Iterator over the messages of a [`SlipSession`].
pub struct Messages<'a, S> {
    session: &'a mut SlipSession<S>,
    done: bool,
}

impl<S: ByteStream> Iterator for Messages<'_, S> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.session.recv_msg() {
            Ok(msg) if msg.is_empty() => {
                self.done = true;
                None
            }
            Ok(msg) => Some(Ok(msg)),
            Err(err) => Some(Err(err)),
        }
    }
}
