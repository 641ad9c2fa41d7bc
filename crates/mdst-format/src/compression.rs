//! Whole-section compression
//!
//! MdST compresses logical file sections (header, station records, index)
//! as single blocks. Which transform applies is a property of the format
//! version, never a per-call choice: [`FormatVersion::V1`] stores every
//! section verbatim, [`FormatVersion::V2`] deflates every section.

use crate::error::{MdstError, MdstResult};
use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

/// Maximum allowed decompressed section size (256 MB)
///
/// Station databases are small; the largest shipped MdST files are a few
/// megabytes. The cap bounds memory use when inflating an untrusted file.
pub const MAX_SECTION_SIZE: usize = 256 * 1024 * 1024;

/// On-disk format version word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Version 1: all sections uncompressed, station-section length word
    /// at file offset 8.
    V1,
    /// Version 2: every section is an independently deflated frame.
    V2,
}

impl FormatVersion {
    /// Parse a version word read from the file.
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }

    /// The version word written to the file.
    pub fn as_word(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// The section transform this version mandates.
    pub fn compression(self) -> SectionCompression {
        match self {
            Self::V1 => SectionCompression::Identity,
            Self::V2 => SectionCompression::Zlib,
        }
    }
}

/// Per-section block transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionCompression {
    /// No transform; bytes are stored as-is.
    Identity,
    /// Zlib stream prefixed with a 4-byte big-endian uncompressed length.
    Zlib,
}

impl SectionCompression {
    /// Compress a section body.
    pub fn compress(self, data: &[u8]) -> MdstResult<Vec<u8>> {
        match self {
            Self::Identity => Ok(data.to_vec()),
            Self::Zlib => {
                let mut encoder = ZlibEncoder::new(data, Compression::best());
                let mut out = Vec::with_capacity(8 + data.len() / 4);
                out.extend_from_slice(&(data.len() as u32).to_be_bytes());
                encoder
                    .read_to_end(&mut out)
                    .map_err(|e| MdstError::CorruptSection(format!("zlib compression failed: {e}")))?;
                Ok(out)
            }
        }
    }

    /// Decompress a section body, validating the embedded length.
    pub fn decompress(self, data: &[u8]) -> MdstResult<Vec<u8>> {
        match self {
            Self::Identity => Ok(data.to_vec()),
            Self::Zlib => {
                if data.len() < 4 {
                    return Err(MdstError::CorruptSection(
                        "compressed section too short for length prefix".into(),
                    ));
                }

                let expected = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
                if expected > MAX_SECTION_SIZE {
                    return Err(MdstError::CorruptSection(format!(
                        "declared section size {expected} exceeds limit of {MAX_SECTION_SIZE} bytes"
                    )));
                }

                let mut decoder = ZlibDecoder::new(&data[4..]);
                let mut out = Vec::with_capacity(expected);
                // take() bounds the read so a lying stream cannot outgrow
                // the declared size unnoticed.
                decoder
                    .by_ref()
                    .take(expected as u64 + 1)
                    .read_to_end(&mut out)
                    .map_err(|e| {
                        MdstError::CorruptSection(format!("zlib decompression failed: {e}"))
                    })?;

                if out.len() != expected {
                    return Err(MdstError::CorruptSection(format!(
                        "decompressed size mismatch: expected {expected}, got {}",
                        out.len()
                    )));
                }

                Ok(out)
            }
        }
    }
}
