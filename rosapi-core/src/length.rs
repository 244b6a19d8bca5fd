//! Word length prefix
//!
//! Every word on the wire is preceded by its length, encoded in one to
//! five bytes. The leading bits of the first byte select the size class:
//!
//! ```text
//! length < 0x80        0xxxxxxx
//! length < 0x4000      10xxxxxx xxxxxxxx
//! length < 0x200000    110xxxxx xxxxxxxx xxxxxxxx
//! length < 0x10000000  1110xxxx xxxxxxxx xxxxxxxx xxxxxxxx
//! otherwise            11110000 xxxxxxxx xxxxxxxx xxxxxxxx xxxxxxxx
//! ```
//!
//! All multi-byte values are big-endian. First bytes `0xF8..=0xFF` are
//! reserved for control bytes and are rejected.

use byteorder::{BigEndian, ByteOrder};
use bytes::BufMut;
use tracing::trace;

use crate::error::{Error, Result};

/// Largest prefix size in bytes
pub const MAX_PREFIX_LEN: usize = 5;

/// Number of bytes `encode` writes for `length`
pub fn encoded_len(length: u32) -> usize {
    match length {
        0..0x80 => 1,
        0x80..0x4000 => 2,
        0x4000..0x20_0000 => 3,
        0x20_0000..0x1000_0000 => 4,
        _ => 5,
    }
}

/// Encode a word length
///
/// # Examples
///
/// ```
/// use rosapi_core::length;
///
/// let mut buf = Vec::new();
/// length::encode(0x87, &mut buf);
/// assert_eq!(buf, vec![0x80, 0x87]);
/// ```
pub fn encode(length: u32, dst: &mut impl BufMut) {
    match length {
        0..0x80 => dst.put_u8(length as u8),
        0x80..0x4000 => dst.put_u16(length as u16 | 0x8000),
        0x4000..0x20_0000 => {
            dst.put_u8((length >> 16) as u8 | 0xC0);
            dst.put_u16(length as u16);
        }
        0x20_0000..0x1000_0000 => dst.put_u32(length | 0xE000_0000),
        _ => {
            dst.put_u8(0xF0);
            dst.put_u32(length);
        }
    }
}

/// Number of bytes that follow the first prefix byte
pub fn continuation_len(first: u8) -> Result<usize> {
    match first {
        0x00..=0x7F => Ok(0),
        0x80..=0xBF => Ok(1),
        0xC0..=0xDF => Ok(2),
        0xE0..=0xEF => Ok(3),
        0xF0..=0xF7 => Ok(4),
        _ => Err(Error::InvalidLengthPrefix(first)),
    }
}

/// Decode a length from its first byte and `continuation_len(first)` more bytes
pub fn decode(first: u8, rest: &[u8]) -> Result<u32> {
    let expected = continuation_len(first)?;
    if rest.len() != expected {
        return Err(Error::InvalidLengthPrefix(first));
    }

    let length = match expected {
        0 => first as u32,
        1 => ((first & 0x3F) as u32) << 8 | rest[0] as u32,
        2 => ((first & 0x1F) as u32) << 16 | BigEndian::read_u16(rest) as u32,
        3 => ((first & 0x0F) as u32) << 24 | BigEndian::read_u24(rest),
        _ => BigEndian::read_u32(rest),
    };

    trace!(
        first = format!("0x{:02X}", first),
        length = length,
        "Decoded word length"
    );

    Ok(length)
}
