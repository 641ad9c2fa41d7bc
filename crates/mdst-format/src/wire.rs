//! Wire codecs for MdST records
//!
//! Every record type serializes the same way: big-endian scalars, a flags
//! byte gating optional fields, varint-length-prefixed UTF-8 strings, and
//! varint-counted `(key, value)` tables. [`Record`] is implemented by the
//! header, stations, dictionary entries and the index; the framing layer
//! ([`crate::frame`]) wraps these payloads uniformly.

use crate::compression::SectionCompression;
use crate::error::{MdstError, MdstResult};
use crate::model::{Line, Name, Operator, Position, Station, StationDb, TransportMode};
use crate::varint::{read_varint, read_varint_u32, write_varint};
use serde::Serialize;
use std::collections::BTreeMap;

/// A type with a byte-exact MdST wire form.
pub trait Record: Sized {
    /// Append this record's encoding to `out`.
    fn encode(&self, out: &mut Vec<u8>) -> MdstResult<()>;

    /// Decode one record from `data`, advancing `offset` past it.
    fn decode(data: &[u8], offset: &mut usize) -> MdstResult<Self>;

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> MdstResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Decode a complete payload; trailing bytes are a decode error.
    fn from_bytes(data: &[u8]) -> MdstResult<Self> {
        let mut offset = 0;
        let record = Self::decode(data, &mut offset)?;
        if offset != data.len() {
            return Err(MdstError::CorruptRecord(format!(
                "{} trailing bytes after record",
                data.len() - offset
            )));
        }
        Ok(record)
    }
}

fn take<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> MdstResult<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .ok_or(MdstError::TruncatedRecord {
            needed: usize::MAX,
            available: data.len(),
        })?;
    if end > data.len() {
        return Err(MdstError::TruncatedRecord {
            needed: end,
            available: data.len(),
        });
    }
    let slice = &data[*offset..end];
    *offset = end;
    Ok(slice)
}

fn read_u8(data: &[u8], offset: &mut usize) -> MdstResult<u8> {
    Ok(take(data, offset, 1)?[0])
}

fn read_f32(data: &[u8], offset: &mut usize) -> MdstResult<f32> {
    let bytes = take(data, offset, 4)?;
    Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_string(data: &[u8], offset: &mut usize) -> MdstResult<String> {
    let len = read_varint_u32(data, offset)? as usize;
    let bytes = take(data, offset, len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| MdstError::CorruptRecord("string is not valid UTF-8".into()))
}

fn write_string(value: &str, out: &mut Vec<u8>) {
    write_varint(value.len() as u64, out);
    out.extend_from_slice(value.as_bytes());
}

fn read_count(data: &[u8], offset: &mut usize, what: &str) -> MdstResult<usize> {
    let count = read_varint_u32(data, offset)? as usize;
    // Each entry takes at least one byte; a count beyond the remaining
    // payload cannot be honest.
    if count > data.len() - *offset {
        return Err(MdstError::CorruptRecord(format!(
            "{what} count {count} exceeds remaining payload"
        )));
    }
    Ok(count)
}

// Name flags byte
const NAME_ENGLISH: u8 = 0x01;
const NAME_ENGLISH_SHORT: u8 = 0x02;
const NAME_LOCAL: u8 = 0x04;
const NAME_LOCAL_SHORT: u8 = 0x08;
const NAME_OTHER: u8 = 0x10;
const NAME_OTHER_SHORT: u8 = 0x20;
const NAME_FLAGS: u8 = 0x3F;

impl Record for Name {
    fn encode(&self, out: &mut Vec<u8>) -> MdstResult<()> {
        let mut flags = 0u8;
        for (bit, field) in [
            (NAME_ENGLISH, &self.english),
            (NAME_ENGLISH_SHORT, &self.english_short),
            (NAME_LOCAL, &self.local),
            (NAME_LOCAL_SHORT, &self.local_short),
        ] {
            if field.is_some() {
                flags |= bit;
            }
        }
        if !self.other.is_empty() {
            flags |= NAME_OTHER;
        }
        if !self.other_short.is_empty() {
            flags |= NAME_OTHER_SHORT;
        }
        out.push(flags);

        for field in [&self.english, &self.english_short, &self.local, &self.local_short] {
            if let Some(value) = field {
                write_string(value, out);
            }
        }
        for map in [&self.other, &self.other_short] {
            if !map.is_empty() {
                write_varint(map.len() as u64, out);
                for (&lang, value) in map {
                    write_varint(u64::from(lang), out);
                    write_string(value, out);
                }
            }
        }
        Ok(())
    }

    fn decode(data: &[u8], offset: &mut usize) -> MdstResult<Self> {
        let flags = read_u8(data, offset)?;
        if flags & !NAME_FLAGS != 0 {
            return Err(MdstError::CorruptRecord(format!(
                "unknown name flags: {flags:#04x}"
            )));
        }

        let mut name = Self::default();
        if flags & NAME_ENGLISH != 0 {
            name.english = Some(read_string(data, offset)?);
        }
        if flags & NAME_ENGLISH_SHORT != 0 {
            name.english_short = Some(read_string(data, offset)?);
        }
        if flags & NAME_LOCAL != 0 {
            name.local = Some(read_string(data, offset)?);
        }
        if flags & NAME_LOCAL_SHORT != 0 {
            name.local_short = Some(read_string(data, offset)?);
        }
        if flags & NAME_OTHER != 0 {
            name.other = read_language_map(data, offset)?;
        }
        if flags & NAME_OTHER_SHORT != 0 {
            name.other_short = read_language_map(data, offset)?;
        }
        Ok(name)
    }
}

fn read_language_map(data: &[u8], offset: &mut usize) -> MdstResult<BTreeMap<u32, String>> {
    let count = read_count(data, offset, "localized name")?;
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let lang = read_varint_u32(data, offset)?;
        map.insert(lang, read_string(data, offset)?);
    }
    Ok(map)
}

fn read_mode(data: &[u8], offset: &mut usize) -> MdstResult<TransportMode> {
    let byte = read_u8(data, offset)?;
    TransportMode::from_byte(byte)
        .ok_or_else(|| MdstError::CorruptRecord(format!("unknown transport mode: {byte:#04x}")))
}

// Station flags byte
const STATION_POSITION: u8 = 0x01;
const STATION_OPERATOR: u8 = 0x02;
const STATION_FLAGS: u8 = 0x03;

impl Record for Station {
    fn encode(&self, out: &mut Vec<u8>) -> MdstResult<()> {
        write_varint(u64::from(self.id), out);
        self.name.encode(out)?;

        let mut flags = 0u8;
        if self.position.is_some() {
            flags |= STATION_POSITION;
        }
        if self.operator_id.is_some() {
            flags |= STATION_OPERATOR;
        }
        out.push(flags);

        if let Some(position) = self.position {
            out.extend_from_slice(&position.latitude.to_be_bytes());
            out.extend_from_slice(&position.longitude.to_be_bytes());
        }
        if let Some(operator_id) = self.operator_id {
            write_varint(u64::from(operator_id), out);
        }
        write_varint(self.line_ids.len() as u64, out);
        for &line_id in &self.line_ids {
            write_varint(u64::from(line_id), out);
        }
        Ok(())
    }

    fn decode(data: &[u8], offset: &mut usize) -> MdstResult<Self> {
        let id = read_varint_u32(data, offset)?;
        let name = Name::decode(data, offset)?;

        let flags = read_u8(data, offset)?;
        if flags & !STATION_FLAGS != 0 {
            return Err(MdstError::CorruptRecord(format!(
                "unknown station flags: {flags:#04x}"
            )));
        }

        let position = if flags & STATION_POSITION != 0 {
            let latitude = read_f32(data, offset)?;
            let longitude = read_f32(data, offset)?;
            Some(Position {
                latitude,
                longitude,
            })
        } else {
            None
        };
        let operator_id = if flags & STATION_OPERATOR != 0 {
            Some(read_varint_u32(data, offset)?)
        } else {
            None
        };

        let line_count = read_count(data, offset, "line reference")?;
        let mut line_ids = Vec::with_capacity(line_count);
        for _ in 0..line_count {
            line_ids.push(read_varint_u32(data, offset)?);
        }

        Ok(Self {
            id,
            name,
            position,
            operator_id,
            line_ids,
        })
    }
}

impl Record for Operator {
    fn encode(&self, out: &mut Vec<u8>) -> MdstResult<()> {
        self.name.encode(out)?;
        out.push(self.default_mode.as_byte());
        Ok(())
    }

    fn decode(data: &[u8], offset: &mut usize) -> MdstResult<Self> {
        Ok(Self {
            name: Name::decode(data, offset)?,
            default_mode: read_mode(data, offset)?,
        })
    }
}

impl Record for Line {
    fn encode(&self, out: &mut Vec<u8>) -> MdstResult<()> {
        self.name.encode(out)?;
        out.push(self.mode.as_byte());
        Ok(())
    }

    fn decode(data: &[u8], offset: &mut usize) -> MdstResult<Self> {
        Ok(Self {
            name: Name::decode(data, offset)?,
            mode: read_mode(data, offset)?,
        })
    }
}

// StationDb flags byte
const DB_TTS_HINT: u8 = 0x01;
const DB_LICENSE_NOTICE: u8 = 0x02;
const DB_FLAGS: u8 = 0x03;

impl Record for StationDb {
    fn encode(&self, out: &mut Vec<u8>) -> MdstResult<()> {
        write_varint(self.content_version, out);

        let mut flags = 0u8;
        if self.tts_hint_language.is_some() {
            flags |= DB_TTS_HINT;
        }
        if self.license_notice.is_some() {
            flags |= DB_LICENSE_NOTICE;
        }
        out.push(flags);

        if let Some(tts) = &self.tts_hint_language {
            write_string(tts, out);
        }
        if let Some(notice) = &self.license_notice {
            // Notices are long legal boilerplate; they are stored deflated
            // in both format versions.
            let blob = SectionCompression::Zlib.compress(notice.as_bytes())?;
            write_varint(blob.len() as u64, out);
            out.extend_from_slice(&blob);
        }

        write_varint(self.local_languages.len() as u64, out);
        for language in &self.local_languages {
            write_string(language, out);
        }

        write_varint(self.languages.len() as u64, out);
        for (code, &id) in &self.languages {
            write_string(code, out);
            write_varint(u64::from(id), out);
        }

        write_varint(self.operators.len() as u64, out);
        for (&id, operator) in &self.operators {
            write_varint(u64::from(id), out);
            operator.encode(out)?;
        }

        write_varint(self.lines.len() as u64, out);
        for (&id, line) in &self.lines {
            write_varint(u64::from(id), out);
            line.encode(out)?;
        }
        Ok(())
    }

    fn decode(data: &[u8], offset: &mut usize) -> MdstResult<Self> {
        let content_version = read_varint(data, offset)?;

        let flags = read_u8(data, offset)?;
        if flags & !DB_FLAGS != 0 {
            return Err(MdstError::CorruptRecord(format!(
                "unknown header flags: {flags:#04x}"
            )));
        }

        let tts_hint_language = if flags & DB_TTS_HINT != 0 {
            Some(read_string(data, offset)?)
        } else {
            None
        };
        let license_notice = if flags & DB_LICENSE_NOTICE != 0 {
            let len = read_varint_u32(data, offset)? as usize;
            let blob = take(data, offset, len)?;
            let bytes = SectionCompression::Zlib.decompress(blob)?;
            Some(String::from_utf8(bytes).map_err(|_| {
                MdstError::CorruptRecord("license notice is not valid UTF-8".into())
            })?)
        } else {
            None
        };

        let language_count = read_count(data, offset, "local language")?;
        let mut local_languages = Vec::with_capacity(language_count);
        for _ in 0..language_count {
            local_languages.push(read_string(data, offset)?);
        }

        let table_count = read_count(data, offset, "language table")?;
        let mut languages = BTreeMap::new();
        for _ in 0..table_count {
            let code = read_string(data, offset)?;
            let id = read_varint_u32(data, offset)?;
            languages.insert(code, id);
        }

        let operator_count = read_count(data, offset, "operator")?;
        let mut operators = BTreeMap::new();
        for _ in 0..operator_count {
            let id = read_varint_u32(data, offset)?;
            operators.insert(id, Operator::decode(data, offset)?);
        }

        let line_count = read_count(data, offset, "line")?;
        let mut lines = BTreeMap::new();
        for _ in 0..line_count {
            let id = read_varint_u32(data, offset)?;
            lines.insert(id, Line::decode(data, offset)?);
        }

        Ok(Self {
            content_version,
            tts_hint_language,
            local_languages,
            languages,
            operators,
            lines,
            license_notice,
        })
    }
}

/// The id → offset table written after the station section.
///
/// Offsets are relative to the start of the (uncompressed) station
/// section. Entries are written in ascending id order so identical record
/// sets index identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StationIndex {
    /// Station id → byte offset of its framed record
    pub entries: BTreeMap<u32, u32>,
}

impl Record for StationIndex {
    fn encode(&self, out: &mut Vec<u8>) -> MdstResult<()> {
        write_varint(self.entries.len() as u64, out);
        for (&id, &record_offset) in &self.entries {
            write_varint(u64::from(id), out);
            write_varint(u64::from(record_offset), out);
        }
        Ok(())
    }

    fn decode(data: &[u8], offset: &mut usize) -> MdstResult<Self> {
        let count = read_count(data, offset, "index entry")?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let id = read_varint_u32(data, offset)?;
            let record_offset = read_varint_u32(data, offset)?;
            entries.insert(id, record_offset);
        }
        Ok(Self { entries })
    }
}
