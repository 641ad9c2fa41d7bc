//! Database builder
//!
//! Two-phase construction: the magic, version word and header go out as
//! soon as the builder is created; station records accumulate in memory
//! with their section-relative offsets; `finalize` emits the station
//! section and the sorted index, and for V1 patches the station-section
//! length word reserved at offset 8.

use crate::compression::FormatVersion;
use crate::error::{MdstError, MdstResult};
use crate::frame::{encode_delimited, write_frame};
use crate::model::{Station, StationDb};
use crate::wire::{Record, StationIndex};
use crate::MAGIC;
use std::collections::BTreeMap;
use std::io::{Seek, SeekFrom, Write};
use tracing::debug;

/// Byte sizes of the finished file, for storage reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Total length of the finished file
    pub total_len: u64,
    /// On-disk length of the framed header
    pub header_len: u64,
    /// On-disk length of the station section
    pub stations_len: u64,
    /// On-disk length of the framed index
    pub index_len: u64,
    /// Stations reachable through the index
    pub station_count: usize,
    /// Pushes that overwrote an earlier id; informational, never an error
    pub duplicate_count: usize,
}

/// Writes a station database to a seekable sink.
///
/// The builder is write-only and single-writer: it owns the sink for its
/// whole lifetime and never reads back what it wrote. After [`finalize`]
/// every further operation fails with [`MdstError::AlreadyFinalized`].
///
/// [`finalize`]: MdstBuilder::finalize
pub struct MdstBuilder<W: Write + Seek> {
    sink: W,
    version: FormatVersion,
    header_len: u64,
    /// In-progress station section, uncompressed framed records
    stations: Vec<u8>,
    /// id → offset within the (uncompressed) station section
    offsets: BTreeMap<u32, u32>,
    duplicate_count: usize,
    finalized: bool,
}

/// File offset of the V1 station-section length word.
const V1_LENGTH_WORD_OFFSET: u64 = 8;

impl<W: Write + Seek> MdstBuilder<W> {
    /// Start a new database, writing the magic, version word and header
    /// immediately.
    ///
    /// Under [`FormatVersion::V1`] a zeroed station-section length word is
    /// reserved before the header and patched during `finalize`; under
    /// [`FormatVersion::V2`] the deflated header frame is written directly
    /// and nothing needs patching.
    pub fn new(mut sink: W, version: FormatVersion, db: &StationDb) -> MdstResult<Self> {
        sink.write_all(&MAGIC)?;
        sink.write_all(&version.as_word().to_be_bytes())?;

        if version == FormatVersion::V1 {
            // Patched with the station-section length at finalize
            sink.write_all(&[0u8; 4])?;
        }

        let header = version.compression().compress(&db.to_bytes()?)?;
        let header_len = write_frame(&mut sink, &header)?;

        debug!(
            version = version.as_word(),
            content_version = db.content_version,
            operators = db.operators.len(),
            lines = db.lines.len(),
            "started station database"
        );

        Ok(Self {
            sink,
            version,
            header_len,
            stations: Vec::new(),
            offsets: BTreeMap::new(),
            duplicate_count: 0,
            finalized: false,
        })
    }

    /// Append one station record.
    ///
    /// A duplicate id is not rejected: the index entry is overwritten, the
    /// earlier record's bytes stay in the data section unreachable, and
    /// the duplicate is counted in [`BuildStats`].
    pub fn push_station(&mut self, station: &Station) -> MdstResult<()> {
        if self.finalized {
            return Err(MdstError::AlreadyFinalized);
        }

        let offset =
            u32::try_from(self.stations.len()).map_err(|_| MdstError::SectionOverflow)?;
        self.stations.extend(encode_delimited(station)?);

        if self.offsets.insert(station.id, offset).is_some() {
            self.duplicate_count += 1;
            debug!(
                id = station.id,
                "duplicate station id; earlier record is now unreachable"
            );
        }
        Ok(())
    }

    /// Sort and write the index, complete the file, and return its sizes.
    ///
    /// Single-use: a second call fails with [`MdstError::AlreadyFinalized`].
    pub fn finalize(&mut self) -> MdstResult<BuildStats> {
        if self.finalized {
            return Err(MdstError::AlreadyFinalized);
        }
        self.finalized = true;

        let compression = self.version.compression();

        let stations_len = match self.version {
            FormatVersion::V1 => {
                // Records are individually framed; the section is stored
                // back to back exactly as accumulated.
                self.sink.write_all(&self.stations)?;
                self.stations.len() as u64
            }
            FormatVersion::V2 => {
                let stored = compression.compress(&self.stations)?;
                write_frame(&mut self.sink, &stored)?
            }
        };

        let index = StationIndex {
            entries: std::mem::take(&mut self.offsets),
        };
        let stored_index = compression.compress(&index.to_bytes()?)?;
        let index_len = write_frame(&mut self.sink, &stored_index)?;

        let total_len = self.sink.stream_position()?;

        if self.version == FormatVersion::V1 {
            // Two-phase write: the length word was provisionally zero.
            let section_len = u32::try_from(self.stations.len())
                .map_err(|_| MdstError::SectionOverflow)?;
            self.sink.seek(SeekFrom::Start(V1_LENGTH_WORD_OFFSET))?;
            self.sink.write_all(&section_len.to_be_bytes())?;
            self.sink.seek(SeekFrom::Start(total_len))?;
        }

        self.sink.flush()?;
        self.stations = Vec::new();

        let stats = BuildStats {
            total_len,
            header_len: self.header_len,
            stations_len,
            index_len,
            station_count: index.entries.len(),
            duplicate_count: self.duplicate_count,
        };
        debug!(
            total_len = stats.total_len,
            stations = stats.station_count,
            duplicates = stats.duplicate_count,
            "finalized station database"
        );
        Ok(stats)
    }
}
