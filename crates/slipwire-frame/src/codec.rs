use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SlipError};

/// Frame delimiter byte.
pub const END: u8 = 0xC0;
/// Escape byte.
pub const ESC: u8 = 0xDB;
/// Escape substitute for an embedded `END`.
pub const ESC_END: u8 = 0xDC;
/// Escape substitute for an embedded `ESC`.
pub const ESC_ESC: u8 = 0xDD;

/// Encode a message into a SLIP packet.
///
/// The packet is the message surrounded by `END` delimiters, with every
/// embedded `END` replaced by `ESC ESC_END` and every embedded `ESC`
/// replaced by `ESC ESC_ESC`. The single byte-wise pass guarantees that
/// a delimiter introduced by escaping is never re-escaped.
pub fn encode(msg: &[u8]) -> Bytes {
    let mut packet = BytesMut::with_capacity(msg.len() + 2);
    packet.put_u8(END);
    for &byte in msg {
        match byte {
            END => {
                packet.put_u8(ESC);
                packet.put_u8(ESC_END);
            }
            ESC => {
                packet.put_u8(ESC);
                packet.put_u8(ESC_ESC);
            }
            _ => packet.put_u8(byte),
        }
    }
    packet.put_u8(END);
    packet.freeze()
}

/// Whether the packet's contents conform to the SLIP specification.
///
/// A packet is valid if it contains no `END` bytes other than leading
/// and/or trailing delimiters, and every `ESC` byte is immediately
/// followed by either `ESC_END` or `ESC_ESC` (so a trailing `ESC` is
/// invalid).
pub fn is_valid(packet: &[u8]) -> bool {
    let mut iter = strip_delimiters(packet).iter();
    while let Some(&byte) = iter.next() {
        match byte {
            END => return false,
            ESC => match iter.next() {
                Some(&ESC_END) | Some(&ESC_ESC) => {}
                _ => return false,
            },
            _ => {}
        }
    }
    true
}

/// Decode exactly one complete SLIP packet into a message.
///
/// Strips any leading/trailing `END` delimiters, then reverses the
/// escaping: `ESC ESC_END` becomes `END` and `ESC ESC_ESC` becomes
/// `ESC`. Provides no buffering for incomplete packets and no support
/// for multi-packet input.
///
/// # Errors
///
/// Returns [`SlipError::Protocol`] carrying the offending packet when
/// the packet contains an invalid byte sequence (see [`is_valid`]).
pub fn decode(packet: &[u8]) -> Result<Bytes> {
    let body = strip_delimiters(packet);
    let mut msg = BytesMut::with_capacity(body.len());
    let mut iter = body.iter();
    while let Some(&byte) = iter.next() {
        match byte {
            END => return Err(SlipError::Protocol(Bytes::copy_from_slice(packet))),
            ESC => match iter.next() {
                Some(&ESC_END) => msg.put_u8(END),
                Some(&ESC_ESC) => msg.put_u8(ESC),
                _ => return Err(SlipError::Protocol(Bytes::copy_from_slice(packet))),
            },
            _ => msg.put_u8(byte),
        }
    }
    Ok(msg.freeze())
}

/// Strip any leading and trailing run of `END` bytes.
fn strip_delimiters(packet: &[u8]) -> &[u8] {
    let Some(start) = packet.iter().position(|&b| b != END) else {
        return &[];
    };
    // There is at least one non-END byte, so rposition succeeds.
    let end = packet.iter().rposition(|&b| b != END).unwrap_or(start) + 1;
    &packet[start..end]
}
