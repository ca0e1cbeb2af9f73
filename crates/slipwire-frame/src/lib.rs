//! SLIP (RFC 1055) message framing.
//!
//! This is the core value-add layer of slipwire. Messages are framed as:
//! - A leading and trailing `END` (0xC0) delimiter byte
//! - Every embedded `END` replaced by the `ESC ESC_END` sequence
//! - Every embedded `ESC` (0xDB) replaced by the `ESC ESC_ESC` sequence
//!
//! Three layers, lowest first:
//! - [`codec`]: pure packet encoding, validation, and decoding
//! - [`Driver`]: incremental frame extraction from arbitrarily fragmented
//!   byte chunks, with timeout-based resynchronization and a recoverable
//!   error channel
//! - [`SlipSession`]: message-oriented send/receive over any
//!   [`ByteStream`](slipwire_transport::ByteStream)
//!
//! No partial frames, no buffer management in user code.

pub mod codec;
pub mod driver;
pub mod error;
pub mod session;

pub use codec::{decode, encode, is_valid, END, ESC, ESC_END, ESC_ESC};
pub use driver::{Driver, FRAME_COMPLETION_TIMEOUT};
pub use error::{Result, SlipError};
pub use session::{Messages, SlipSession};
