//! Compact, immutable station database format
//!
//! A station database maps numeric station ids to station records
//! (names, position, operator and line references) for offline lookup
//! on constrained devices. Files are built once, shipped read-only, and
//! queried by id in O(1) seeks without loading the station payload into
//! memory.
//!
//! Two format versions share one record encoding:
//!
//! - **V1** stores all sections uncompressed and carries the station
//!   section's byte length in the preamble so a reader can skip straight
//!   to the index.
//! - **V2** zlib-compresses each section independently; sections are
//!   self-describing length-prefixed frames.
//!
//! # Examples
//!
//! ```no_run
//! use mdst_format::{FormatVersion, MdstBuilder, MdstReader, Station, StationDb};
//! use std::fs::File;
//!
//! # fn main() -> mdst_format::MdstResult<()> {
//! let sink = File::create("stations.mdst")?;
//! let mut builder = MdstBuilder::new(sink, FormatVersion::V2, &StationDb::default())?;
//! builder.push_station(&Station {
//!     id: 42,
//!     ..Default::default()
//! })?;
//! builder.finalize()?;
//!
//! let mut reader = MdstReader::open_path("stations.mdst")?;
//! assert!(reader.get(42)?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compression;
pub mod error;
pub mod frame;
pub mod model;
pub mod reader;
pub mod varint;
pub mod wire;

pub use builder::{BuildStats, MdstBuilder};
pub use compression::{FormatVersion, SectionCompression, MAX_SECTION_SIZE};
pub use error::{MdstError, MdstResult};
pub use model::{Line, Name, Operator, Position, Station, StationDb, TransportMode};
pub use reader::{MdstReader, SectionSizes, StationIter};
pub use wire::{Record, StationIndex};

/// File magic, the first four bytes of every database.
pub const MAGIC: [u8; 4] = *b"MdST";
