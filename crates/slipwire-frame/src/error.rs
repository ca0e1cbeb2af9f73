use bytes::Bytes;

/// Errors that can occur while decoding or exchanging SLIP messages.
#[derive(Debug, thiserror::Error)]
pub enum SlipError {
    /// A packet contained an invalid byte sequence: an embedded
    /// unescaped `END`, a trailing `ESC`, or an `ESC` followed by
    /// neither `ESC_END` nor `ESC_ESC`. Carries the offending packet.
    #[error("protocol error: invalid byte sequence in packet {0:?}")]
    Protocol(Bytes),

    /// A failure surfaced by the underlying byte stream.
    #[error("transport error: {0}")]
    Transport(#[from] slipwire_transport::TransportError),
}

impl SlipError {
    /// The raw packet that failed validation, if this is a protocol error.
    pub fn packet(&self) -> Option<&Bytes> {
        match self {
            SlipError::Protocol(packet) => Some(packet),
            SlipError::Transport(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlipError>;
