//! Varint framing and the streaming atom decoder.

use bytes::{Buf, BytesMut};
use twl_types::Hash;

use crate::error::{StoreError, StoreResult};
use crate::packet::{decode_at, read_hash, Packet};

/// Parses a binary atom stream incrementally.
///
/// The stream has no outer framing, so bytes may arrive in arbitrary
/// chunks: [`feed`](Self::feed) buffers them and
/// [`next_atom`](Self::next_atom) yields each `(hash, packet)` pair as soon
/// as it is complete. Every pair is re-verified before it is returned.
#[derive(Debug, Default)]
pub struct AtomDecoder {
    buf: BytesMut,
    offset: u64,
}

impl AtomDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer another chunk of the stream.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes of the stream consumed so far.
    pub fn consumed(&self) -> u64 {
        self.offset
    }

    /// Pop the next complete atom, or `Ok(None)` if more bytes are needed.
    pub fn next_atom(&mut self) -> StoreResult<Option<(Hash, Packet)>> {
        if self.buf.len() < Hash::LEN {
            return Ok(None);
        }
        let hash = read_hash(&self.buf[..Hash::LEN]);
        let Some((packet, used)) = decode_at(&self.buf[Hash::LEN..], self.offset + Hash::LEN as u64)?
        else {
            return Ok(None);
        };

        let computed = packet.hash();
        if computed != hash {
            return Err(StoreError::Integrity {
                expected: hash,
                computed,
            });
        }

        let total = Hash::LEN + used;
        self.buf.advance(total);
        self.offset += total as u64;
        Ok(Some((hash, packet)))
    }

    /// Finish the stream. Leftover bytes mean the stream was cut mid-atom.
    pub fn finish(self) -> StoreResult<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Truncated {
                offset: self.offset,
            })
        }
    }
}

/// Encode a u64 as a variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns `(value, bytes_consumed)`, or
/// `None` if `data` ends before the varint does.
///
/// Only the shortest encoding of a value is accepted: a zero final byte
/// after the first and bits beyond the 64th are both errors.
pub(crate) fn decode_varint(data: &[u8]) -> Result<Option<(u64, usize)>, &'static str> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        if shift >= 64 || (shift == 63 && byte > 1) {
            return Err("varint overflow");
        }
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err("non-canonical varint");
            }
            return Ok(Some((value, i + 1)));
        }
    }
    Ok(None)
}
