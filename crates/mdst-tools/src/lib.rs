//! Station database CLI library
//!
//! Core functionality for the `mdst` command-line tool.

pub mod commands;
pub mod output;

// Re-export command handlers
pub use crate::commands::{
    dump::handle as handle_dump, info::handle as handle_info, lookup::handle as handle_lookup,
    recompress::handle as handle_recompress,
};

/// Output format options for the CLI
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}
