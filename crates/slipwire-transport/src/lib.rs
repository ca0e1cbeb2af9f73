//! Transport abstraction for SLIP sessions.
//!
//! SLIP itself is transport-agnostic: it only needs something that can
//! write bytes and read chunks of bytes. This crate defines that contract
//! ([`ByteStream`]) and provides two concrete adapters:
//!
//! - [`TcpByteStream`] / [`SlipListener`] for TCP sockets
//! - [`IoByteStream`] for anything implementing `Read + Write`
//!   (socket pairs, serial handles, pipes)
//!
//! This is the lowest layer of slipwire. The framing and session layers
//! build on top of the [`ByteStream`] trait defined here.

pub mod error;
pub mod io;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use io::IoByteStream;
pub use tcp::{SlipListener, TcpByteStream};
pub use traits::{ByteStream, ReadOutcome, DEFAULT_CHUNK_SIZE};
