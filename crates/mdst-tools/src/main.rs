use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use mdst_tools::{OutputFormat, commands};

#[derive(Parser)]
#[command(
    name = "mdst",
    about = "Tools for compact station database files",
    version,
    author,
    long_about = "Inspect, query, dump, and rebuild station database files used for offline station-id lookup."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show file-level metadata and section sizes
    Info {
        /// Database file to inspect
        file: PathBuf,
    },

    /// Look up stations by id
    Lookup {
        /// Database file to query
        file: PathBuf,

        /// Station ids, decimal or 0x-prefixed hex
        #[arg(required = true)]
        ids: Vec<String>,

        /// Prefer English name forms over local ones
        #[arg(short, long)]
        english: bool,
    },

    /// List every station in the database
    Dump {
        /// Database file to read
        file: PathBuf,

        /// Stop after this many stations
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Rebuild a database under the other format version
    Recompress {
        /// Source database file
        file: PathBuf,

        /// Destination path
        #[arg(short = 'O', long)]
        output: PathBuf,

        /// Target format version (1 or 2); defaults to the opposite of
        /// the source
        #[arg(short, long)]
        to: Option<u32>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Info { file } => commands::info::handle(&file, cli.format)?,
        Commands::Lookup { file, ids, english } => {
            commands::lookup::handle(&file, &ids, english, cli.format)?;
        }
        Commands::Dump { file, limit } => commands::dump::handle(&file, limit, cli.format)?,
        Commands::Recompress { file, output, to } => {
            commands::recompress::handle(&file, &output, to, cli.format)?;
        }
    }

    Ok(())
}
