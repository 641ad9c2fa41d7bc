//! `mdst recompress` — rebuild a database under the other format version

use crate::OutputFormat;
use crate::output::format_key_value;
use anyhow::{Context, bail};
use mdst_format::{FormatVersion, MdstBuilder, MdstReader};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct RecompressReport {
    source_version: u32,
    target_version: u32,
    station_count: usize,
    duplicate_count: usize,
    input_bytes: u64,
    output_bytes: u64,
}

pub fn handle(
    file: &Path,
    output: &Path,
    to: Option<u32>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut reader =
        MdstReader::open_path(file).with_context(|| format!("opening {}", file.display()))?;

    let target = match to {
        Some(word) => match FormatVersion::from_word(word) {
            Some(version) => version,
            None => bail!("unsupported target version {word}"),
        },
        // Default to flipping the version
        None => match reader.version() {
            FormatVersion::V1 => FormatVersion::V2,
            FormatVersion::V2 => FormatVersion::V1,
        },
    };

    let sink = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut builder = MdstBuilder::new(sink, target, reader.station_db())?;
    let source_version = reader.version();
    for station in reader.stations()? {
        builder.push_station(&station.context("station section is corrupt")?)?;
    }
    let stats = builder.finalize()?;

    let report = RecompressReport {
        source_version: source_version.as_word(),
        target_version: target.as_word(),
        station_count: stats.station_count,
        duplicate_count: stats.duplicate_count,
        input_bytes: std::fs::metadata(file)?.len(),
        output_bytes: stats.total_len,
    };
    info!(
        stations = report.station_count,
        bytes = report.output_bytes,
        "wrote {}",
        output.display()
    );

    match format {
        OutputFormat::Text => {
            println!(
                "{}",
                format_key_value(
                    "Rebuilt",
                    &format!(
                        "{} (v{}) -> {} (v{})",
                        file.display(),
                        report.source_version,
                        output.display(),
                        report.target_version
                    )
                )
            );
            println!(
                "{}",
                format_key_value("Stations", &report.station_count.to_string())
            );
            println!(
                "{}",
                format_key_value(
                    "Size",
                    &format!("{} -> {} bytes", report.input_bytes, report.output_bytes)
                )
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
