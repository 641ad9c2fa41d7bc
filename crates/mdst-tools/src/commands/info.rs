//! `mdst info` — file-level metadata

use crate::OutputFormat;
use crate::output::{create_table, format_key_value, header_cell, numeric_cell, regular_cell};
use anyhow::Context;
use mdst_format::MdstReader;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct InfoReport<'a> {
    format_version: u32,
    content_version: u64,
    station_count: usize,
    operator_count: usize,
    line_count: usize,
    tts_hint_language: Option<&'a str>,
    local_languages: &'a [String],
    license_notice: Option<&'a str>,
    header_bytes: u64,
    station_section_bytes: Option<u64>,
    index_bytes: Option<u64>,
    average_station_bytes: Option<u64>,
}

pub fn handle(file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let mut reader =
        MdstReader::open_path(file).with_context(|| format!("opening {}", file.display()))?;
    let station_count = reader.station_count()?;
    let sizes = reader.section_sizes();
    let db = reader.station_db();

    let report = InfoReport {
        format_version: reader.version().as_word(),
        content_version: db.content_version,
        station_count,
        operator_count: db.operators.len(),
        line_count: db.lines.len(),
        tts_hint_language: db.tts_hint_language.as_deref(),
        local_languages: &db.local_languages,
        license_notice: db.license_notice.as_deref(),
        header_bytes: sizes.header,
        station_section_bytes: sizes.stations,
        index_bytes: sizes.index,
        average_station_bytes: sizes.stations.and_then(|bytes| {
            let count = station_count as u64;
            (count > 0).then(|| bytes / count)
        }),
    };

    match format {
        OutputFormat::Text => {
            println!(
                "{}",
                format_key_value("File", &file.display().to_string())
            );
            println!(
                "{}",
                format_key_value("Format version", &report.format_version.to_string())
            );
            println!(
                "{}",
                format_key_value("Content version", &report.content_version.to_string())
            );
            if let Some(tts) = report.tts_hint_language {
                println!("{}", format_key_value("TTS hint language", tts));
            }
            if !report.local_languages.is_empty() {
                println!(
                    "{}",
                    format_key_value("Local languages", &report.local_languages.join(", "))
                );
            }

            let mut table = create_table();
            table.set_header(vec![header_cell("Section"), header_cell("Entries"), header_cell("Bytes")]);
            table.add_row(vec![
                regular_cell("Header"),
                numeric_cell(&format!(
                    "{} operators, {} lines",
                    report.operator_count, report.line_count
                )),
                numeric_cell(&report.header_bytes.to_string()),
            ]);
            table.add_row(vec![
                regular_cell("Stations"),
                numeric_cell(&report.station_count.to_string()),
                numeric_cell(&optional_bytes(report.station_section_bytes)),
            ]);
            table.add_row(vec![
                regular_cell("Index"),
                numeric_cell(&report.station_count.to_string()),
                numeric_cell(&optional_bytes(report.index_bytes)),
            ]);
            println!("{table}");
            if let Some(average) = report.average_station_bytes {
                println!(
                    "{}",
                    format_key_value("Average station record", &format!("{average} bytes"))
                );
            }

            if let Some(notice) = report.license_notice {
                println!("\n{notice}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

fn optional_bytes(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| "-".to_string(), |b| b.to_string())
}
