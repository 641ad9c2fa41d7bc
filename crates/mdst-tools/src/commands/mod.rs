//! Command implementations for the `mdst` binary

pub mod dump;
pub mod info;
pub mod lookup;
pub mod recompress;
