//! MdST error types

use thiserror::Error;

/// MdST-specific error type
#[derive(Debug, Error)]
pub enum MdstError {
    /// Invalid MdST magic bytes
    #[error("invalid MdST magic: expected [4D 64 53 54], got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Unrecognized format version word
    #[error("unsupported MdST format version: {0}")]
    UnsupportedVersion(u32),

    /// A framed record ended before its declared length
    #[error("truncated record: needed {needed} bytes, {available} available")]
    TruncatedRecord {
        /// Bytes the frame or field declared
        needed: usize,
        /// Bytes actually available
        available: usize,
    },

    /// A framed payload could not be decoded
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// A file section failed decompression or length validation
    #[error("corrupt section: {0}")]
    CorruptSection(String),

    /// The builder was used after `finalize`
    #[error("database already finalized")]
    AlreadyFinalized,

    /// The station section outgrew the 32-bit offset space
    #[error("station section exceeds 32-bit offset range")]
    SectionOverflow,

    /// A station referenced a dictionary entry absent from the header
    #[error("dangling {table} reference: id {id} not in header")]
    DanglingReference {
        /// Dictionary name ("operator" or "line")
        table: &'static str,
        /// The referenced id
        id: u32,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for MdST operations
pub type MdstResult<T> = Result<T, MdstError>;
