//! Record framing
//!
//! There is exactly one framing rule in the whole format: a varint byte
//! length followed by that many payload bytes. The header, every station
//! record and the index all go through this module, whether they sit in a
//! file or in a decompressed in-memory section.

use crate::compression::MAX_SECTION_SIZE;
use crate::error::{MdstError, MdstResult};
use crate::varint::{read_varint, write_varint};
use crate::wire::Record;
use std::io::{ErrorKind, Read, Write};

/// Frame a raw payload: varint length prefix, then the bytes.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> MdstResult<u64> {
    let mut prefix = Vec::with_capacity(10);
    write_varint(payload.len() as u64, &mut prefix);
    writer.write_all(&prefix)?;
    writer.write_all(payload)?;
    Ok(prefix.len() as u64 + payload.len() as u64)
}

/// Encode a record and frame it into a fresh buffer.
pub fn encode_delimited<R: Record>(record: &R) -> MdstResult<Vec<u8>> {
    let payload = record.to_bytes()?;
    let mut out = Vec::with_capacity(payload.len() + 5);
    write_varint(payload.len() as u64, &mut out);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Read one frame's payload from a stream.
///
/// The length prefix is consumed a byte at a time, so the cursor is
/// already positioned on the first payload byte once the length is known;
/// exactly `length` bytes are then read. EOF inside the prefix or the
/// payload is a [`MdstError::TruncatedRecord`].
pub fn read_frame<R: Read>(reader: &mut R) -> MdstResult<Vec<u8>> {
    let mut prefix = Vec::with_capacity(10);
    let len = loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).map_err(map_eof)?;
        prefix.push(byte[0]);
        if byte[0] & 0x80 == 0 {
            let mut offset = 0;
            break read_varint(&prefix, &mut offset)?;
        }
        if prefix.len() >= 10 {
            return Err(MdstError::CorruptRecord("varint longer than 10 bytes".into()));
        }
    };

    let len = usize::try_from(len)
        .ok()
        .filter(|&len| len <= MAX_SECTION_SIZE)
        .ok_or_else(|| {
            MdstError::CorruptRecord(format!("frame length {len} exceeds section size limit"))
        })?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).map_err(map_eof)?;
    Ok(payload)
}

/// Read one framed record from a stream.
pub fn decode_delimited<T: Record, R: Read>(reader: &mut R) -> MdstResult<T> {
    let payload = read_frame(reader)?;
    T::from_bytes(&payload)
}

/// Read one frame's payload out of an in-memory section.
pub fn read_frame_slice<'a>(data: &'a [u8], offset: &mut usize) -> MdstResult<&'a [u8]> {
    let len = read_varint(data, offset)?;
    let len = usize::try_from(len)
        .map_err(|_| MdstError::CorruptRecord(format!("frame length {len} overflows")))?;
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or(MdstError::TruncatedRecord {
            needed: offset.saturating_add(len),
            available: data.len(),
        })?;
    let payload = &data[*offset..end];
    *offset = end;
    Ok(payload)
}

/// Decode one framed record out of an in-memory section.
pub fn decode_delimited_slice<T: Record>(data: &[u8], offset: &mut usize) -> MdstResult<T> {
    let payload = read_frame_slice(data, offset)?;
    T::from_bytes(payload)
}

fn map_eof(err: std::io::Error) -> MdstError {
    if err.kind() == ErrorKind::UnexpectedEof {
        MdstError::TruncatedRecord {
            needed: 1,
            available: 0,
        }
    } else {
        MdstError::Io(err)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Name, Station};
    use std::io::Cursor;

    #[test]
    fn test_frame_round_trip_stream() {
        let station = Station {
            id: 42,
            name: Name::english("Roma Street"),
            ..Station::default()
        };

        let framed = encode_delimited(&station).expect("should encode");
        let mut cursor = Cursor::new(framed.clone());
        let decoded: Station = decode_delimited(&mut cursor).expect("should decode");
        assert_eq!(decoded, station);
        assert_eq!(cursor.position() as usize, framed.len());
    }

    #[test]
    fn test_frame_round_trip_slice() {
        let station = Station {
            id: 42,
            name: Name::english("Roma Street"),
            ..Station::default()
        };

        // Two frames back to back, as in the station section
        let mut section = encode_delimited(&station).expect("should encode");
        let second = Station {
            id: 43,
            ..Station::default()
        };
        section.extend(encode_delimited(&second).expect("should encode"));

        let mut offset = 0;
        let a: Station = decode_delimited_slice(&section, &mut offset).expect("should decode");
        let b: Station = decode_delimited_slice(&section, &mut offset).expect("should decode");
        assert_eq!(a, station);
        assert_eq!(b, second);
        assert_eq!(offset, section.len());
    }

    #[test]
    fn test_empty_payload_frame() {
        let mut buf = Vec::new();
        let written = write_frame(&mut buf, &[]).expect("should write");
        assert_eq!(written, 1);
        assert_eq!(buf, [0x00]);

        let mut cursor = Cursor::new(buf);
        let payload = read_frame(&mut cursor).expect("should read");
        assert!(payload.is_empty());
    }

    #[test]
    fn test_multibyte_length_prefix() {
        let payload = vec![0xABu8; 300];
        let mut buf = Vec::new();
        write_frame(&mut buf, &payload).expect("should write");
        // 300 needs a two-byte varint
        assert_eq!(buf.len(), 2 + 300);

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).expect("should read"), payload);
    }

    #[test]
    fn test_truncated_prefix() {
        // Continuation bit set, then EOF
        let mut cursor = Cursor::new(vec![0x80u8]);
        let err = read_frame(&mut cursor).expect_err("should fail");
        assert!(matches!(err, MdstError::TruncatedRecord { .. }));

        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = read_frame(&mut cursor).expect_err("should fail");
        assert!(matches!(err, MdstError::TruncatedRecord { .. }));
    }

    #[test]
    fn test_truncated_payload() {
        // Declares 10 bytes, provides 3
        let mut cursor = Cursor::new(vec![0x0Au8, 0x01, 0x02, 0x03]);
        let err = read_frame(&mut cursor).expect_err("should fail");
        assert!(matches!(err, MdstError::TruncatedRecord { .. }));

        let data = [0x0Au8, 0x01, 0x02, 0x03];
        let mut offset = 0;
        let err = read_frame_slice(&data, &mut offset).expect_err("should fail");
        assert!(matches!(err, MdstError::TruncatedRecord { .. }));
    }

    #[test]
    fn test_absurd_length_rejected() {
        let mut framed = Vec::new();
        write_varint(u64::MAX, &mut framed);
        let mut cursor = Cursor::new(framed);
        let err = read_frame(&mut cursor).expect_err("should fail");
        assert!(matches!(err, MdstError::CorruptRecord(_)));
    }

    #[test]
    fn test_undecodable_payload_is_corrupt_record() {
        // A one-byte frame is not a valid Station
        let mut cursor = Cursor::new(vec![0x01u8, 0xFF]);
        let err = decode_delimited::<Station, _>(&mut cursor).expect_err("should fail");
        assert!(matches!(
            err,
            MdstError::CorruptRecord(_) | MdstError::TruncatedRecord { .. }
        ));
    }
}
