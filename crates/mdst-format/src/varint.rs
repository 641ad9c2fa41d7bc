//! Variable-length integer encoding
//!
//! MdST uses LEB128 varints for frame lengths, string lengths, table
//! counts, ids and offsets.

use crate::error::{MdstError, MdstResult};

/// Longest legal encoding of a u64 (10 bytes of 7 payload bits each).
const MAX_VARINT_LEN: usize = 10;

/// Read a varint from `data`, advancing `offset` past the bytes consumed.
pub fn read_varint(data: &[u8], offset: &mut usize) -> MdstResult<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;

    for len in 1..=MAX_VARINT_LEN {
        let Some(&byte) = data.get(*offset) else {
            return Err(MdstError::TruncatedRecord {
                needed: *offset + 1,
                available: data.len(),
            });
        };
        *offset += 1;

        // Take lower 7 bits
        result |= u64::from(byte & 0x7F) << shift;

        // High bit clear means this was the last byte
        if byte & 0x80 == 0 {
            // The 10th byte may only carry the single remaining bit
            if len == MAX_VARINT_LEN && byte > 0x01 {
                return Err(MdstError::CorruptRecord("varint overflows u64".into()));
            }
            return Ok(result);
        }

        shift += 7;
    }

    Err(MdstError::CorruptRecord("varint longer than 10 bytes".into()))
}

/// Read a varint that must fit in a u32 (ids, offsets, counts).
pub fn read_varint_u32(data: &[u8], offset: &mut usize) -> MdstResult<u32> {
    let value = read_varint(data, offset)?;
    u32::try_from(value)
        .map_err(|_| MdstError::CorruptRecord(format!("varint {value} overflows u32")))
}

/// Append the varint encoding of `value` to `data`.
pub fn write_varint(value: u64, data: &mut Vec<u8>) {
    let mut value = value;

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80; // Continuation bit
        }

        data.push(byte);

        if value == 0 {
            break;
        }
    }
}

/// Number of bytes `write_varint` would emit for `value`.
pub fn varint_len(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        (64 - value.leading_zeros()).div_ceil(7) as usize
    }
}
