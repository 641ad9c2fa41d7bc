//! Database reader
//!
//! Opens a finished database, validates the preamble, loads the header,
//! and resolves station ids through the lazily loaded index. Under V1 a
//! lookup seeks to and decodes a single framed record; under V2 the
//! station section is inflated once into an owned buffer and lookups
//! address into it, since records inside a deflated section cannot be
//! decompressed independently.

use crate::compression::FormatVersion;
use crate::error::{MdstError, MdstResult};
use crate::frame::{decode_delimited, read_frame};
use crate::model::{Line, Operator, Station, StationDb};
use crate::varint::varint_len;
use crate::wire::{Record, StationIndex};
use crate::MAGIC;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// On-disk byte sizes of the three file sections.
///
/// Sizes that have not been discovered yet are `None`: under V2 the
/// station and index frame lengths only become known once those sections
/// are first read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionSizes {
    /// Framed header as stored
    pub header: u64,
    /// Station section as stored
    pub stations: Option<u64>,
    /// Framed index as stored
    pub index: Option<u64>,
}

/// Random-access reader over a station database.
///
/// Each reader owns its source and cursor; open as many readers as needed
/// over the same immutable file, they never observe each other.
#[derive(Debug)]
pub struct MdstReader<R: Read + Seek> {
    source: R,
    version: FormatVersion,
    db: StationDb,
    header_len: u64,
    /// File offset where the station section (V1) or its frame (V2) starts
    stations_start: u64,
    /// V1: station-section byte length from the offset-8 word
    v1_stations_len: u32,
    /// V2: file offset of the index frame, known after the station frame
    /// is read
    index_start: Option<u64>,
    /// V2: inflated station section
    stations_buf: Option<Vec<u8>>,
    index: Option<BTreeMap<u32, u32>>,
    index_len: Option<u64>,
}

impl MdstReader<BufReader<File>> {
    /// Open a database file from disk.
    pub fn open_path(path: impl AsRef<Path>) -> MdstResult<Self> {
        Self::open(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> MdstReader<R> {
    /// Open a database, validating the magic and version word and loading
    /// the header. The index is not read until it is first needed.
    pub fn open(mut source: R) -> MdstResult<Self> {
        let mut magic = [0u8; 4];
        source.read_exact(&mut magic).map_err(map_preamble_eof)?;
        if magic != MAGIC {
            return Err(MdstError::InvalidMagic(magic));
        }

        let mut word = [0u8; 4];
        source.read_exact(&mut word).map_err(map_preamble_eof)?;
        let word = u32::from_be_bytes(word);
        // An unknown version means an unknown layout; the header is not
        // touched.
        let version =
            FormatVersion::from_word(word).ok_or(MdstError::UnsupportedVersion(word))?;

        let mut v1_stations_len = 0u32;
        if version == FormatVersion::V1 {
            let mut len = [0u8; 4];
            source.read_exact(&mut len).map_err(map_preamble_eof)?;
            v1_stations_len = u32::from_be_bytes(len);
        }

        let header_frame = read_frame(&mut source)?;
        let header_len = varint_len(header_frame.len() as u64) as u64 + header_frame.len() as u64;
        let db = StationDb::from_bytes(&version.compression().decompress(&header_frame)?)?;
        let stations_start = source.stream_position()?;

        debug!(
            version = version.as_word(),
            content_version = db.content_version,
            operators = db.operators.len(),
            lines = db.lines.len(),
            "opened station database"
        );

        Ok(Self {
            source,
            version,
            db,
            header_len,
            stations_start,
            v1_stations_len,
            index_start: None,
            stations_buf: None,
            index: None,
            index_len: None,
        })
    }

    /// The file's format version.
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Revision of the source data this file was built from.
    pub fn content_version(&self) -> u64 {
        self.db.content_version
    }

    /// Language hint for pronouncing station names.
    pub fn tts_hint_language(&self) -> Option<&str> {
        self.db.tts_hint_language.as_deref()
    }

    /// Languages for which the local name forms are preferred.
    pub fn local_languages(&self) -> &[String] {
        &self.db.local_languages
    }

    /// Attribution text for the data source, if any.
    pub fn license_notice(&self) -> Option<&str> {
        self.db.license_notice.as_deref()
    }

    /// The header aggregate, including the operator and line dictionaries.
    pub fn station_db(&self) -> &StationDb {
        &self.db
    }

    /// On-disk section sizes discovered so far.
    pub fn section_sizes(&self) -> SectionSizes {
        let stations = match self.version {
            FormatVersion::V1 => Some(u64::from(self.v1_stations_len)),
            FormatVersion::V2 => self
                .index_start
                .map(|index_start| index_start - self.stations_start),
        };
        SectionSizes {
            header: self.header_len,
            stations,
            index: self.index_len,
        }
    }

    /// Read the index into memory. Idempotent; `get` calls this lazily on
    /// first use, so calling it directly is only an up-front-cost choice.
    pub fn load_index(&mut self) -> MdstResult<()> {
        if self.index.is_some() {
            return Ok(());
        }

        let index_start = match self.version {
            FormatVersion::V1 => self.stations_start + u64::from(self.v1_stations_len),
            FormatVersion::V2 => {
                self.ensure_stations_buf()?;
                // set by ensure_stations_buf
                self.index_start.ok_or_else(|| {
                    MdstError::CorruptSection("index position unknown".into())
                })?
            }
        };

        self.source.seek(SeekFrom::Start(index_start))?;
        let frame = read_frame(&mut self.source)?;
        self.index_len = Some(varint_len(frame.len() as u64) as u64 + frame.len() as u64);
        let index = StationIndex::from_bytes(&self.version.compression().decompress(&frame)?)?;

        debug!(entries = index.entries.len(), "loaded station index");
        self.index = Some(index.entries);
        Ok(())
    }

    /// Number of stations reachable through the index.
    pub fn station_count(&mut self) -> MdstResult<usize> {
        self.load_index()?;
        Ok(self.index.as_ref().map_or(0, BTreeMap::len))
    }

    /// Ids of every station in the index, ascending.
    pub fn station_ids(&mut self) -> MdstResult<Vec<u32>> {
        self.load_index()?;
        Ok(self
            .index
            .as_ref()
            .map_or_else(Vec::new, |index| index.keys().copied().collect()))
    }

    /// Look up one station by id.
    ///
    /// `Ok(None)` is the ordinary miss for an id the database does not
    /// contain; errors are reserved for structural problems with the file.
    pub fn get(&mut self, id: u32) -> MdstResult<Option<Station>> {
        self.load_index()?;
        let Some(&offset) = self.index.as_ref().and_then(|index| index.get(&id)) else {
            return Ok(None);
        };

        let station = match self.version {
            FormatVersion::V1 => {
                if offset >= self.v1_stations_len {
                    return Err(MdstError::CorruptSection(format!(
                        "index offset {offset} beyond station section"
                    )));
                }
                self.source
                    .seek(SeekFrom::Start(self.stations_start + u64::from(offset)))?;
                decode_delimited(&mut self.source)?
            }
            FormatVersion::V2 => {
                self.ensure_stations_buf()?;
                let buf = self.stations_buf.as_deref().unwrap_or_default();
                let mut pos = offset as usize;
                if pos >= buf.len() {
                    return Err(MdstError::CorruptSection(format!(
                        "index offset {offset} beyond station section"
                    )));
                }
                crate::frame::decode_delimited_slice(buf, &mut pos)?
            }
        };
        Ok(Some(station))
    }

    /// Iterate every station in on-disk (insertion) order.
    ///
    /// A decode failure ends the iteration with that error; restart by
    /// reopening the database.
    pub fn stations(&mut self) -> MdstResult<StationIter<'_, R>> {
        match self.version {
            FormatVersion::V1 => {
                self.source.seek(SeekFrom::Start(self.stations_start))?;
            }
            FormatVersion::V2 => {
                self.ensure_stations_buf()?;
            }
        }
        Ok(StationIter {
            reader: self,
            consumed: 0,
            failed: false,
        })
    }

    /// Resolve an operator reference from a station record.
    ///
    /// Every `operator_id` a station carries is expected to exist in the
    /// header; a miss means a corrupt or mismatched database.
    pub fn resolve_operator(&self, id: u32) -> MdstResult<&Operator> {
        self.db
            .operators
            .get(&id)
            .ok_or(MdstError::DanglingReference {
                table: "operator",
                id,
            })
    }

    /// Resolve a line reference from a station record.
    pub fn resolve_line(&self, id: u32) -> MdstResult<&Line> {
        self.db.lines.get(&id).ok_or(MdstError::DanglingReference {
            table: "line",
            id,
        })
    }

    /// V2 only: inflate the station section into memory once.
    fn ensure_stations_buf(&mut self) -> MdstResult<()> {
        if self.stations_buf.is_some() {
            return Ok(());
        }
        self.source.seek(SeekFrom::Start(self.stations_start))?;
        let frame = read_frame(&mut self.source)?;
        self.index_start = Some(self.source.stream_position()?);
        self.stations_buf = Some(self.version.compression().decompress(&frame)?);
        Ok(())
    }
}

fn map_preamble_eof(err: std::io::Error) -> MdstError {
    if err.kind() == ErrorKind::UnexpectedEof {
        MdstError::TruncatedRecord {
            needed: 4,
            available: 0,
        }
    } else {
        MdstError::Io(err)
    }
}

/// Iterator over every station in on-disk order.
///
/// Holds the reader's cursor for its lifetime; a decode error fuses the
/// iterator after yielding the error once.
pub struct StationIter<'a, R: Read + Seek> {
    reader: &'a mut MdstReader<R>,
    /// Bytes of the (uncompressed) station section consumed so far
    consumed: u64,
    failed: bool,
}

impl<R: Read + Seek> Iterator for StationIter<'_, R> {
    type Item = MdstResult<Station>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let result = match self.reader.version {
            FormatVersion::V1 => {
                let section_len = u64::from(self.reader.v1_stations_len);
                if self.consumed >= section_len {
                    return None;
                }
                match read_frame(&mut self.reader.source) {
                    Ok(payload) => {
                        self.consumed +=
                            varint_len(payload.len() as u64) as u64 + payload.len() as u64;
                        if self.consumed > section_len {
                            Err(MdstError::CorruptSection(
                                "station record extends past section end".into(),
                            ))
                        } else {
                            Station::from_bytes(&payload)
                        }
                    }
                    Err(err) => Err(err),
                }
            }
            FormatVersion::V2 => {
                let buf = self.reader.stations_buf.as_deref().unwrap_or_default();
                if self.consumed >= buf.len() as u64 {
                    return None;
                }
                let mut pos = self.consumed as usize;
                let result = crate::frame::decode_delimited_slice(buf, &mut pos);
                self.consumed = pos as u64;
                result
            }
        };

        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
