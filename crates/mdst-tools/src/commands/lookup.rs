//! `mdst lookup` — random-access station queries

use crate::OutputFormat;
use crate::output::format_key_value;
use anyhow::Context;
use mdst_format::{MdstReader, Station};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct LookupEntry {
    id: u32,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    station: Option<Station>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    lines: Vec<String>,
}

/// Parse a station id in decimal or `0x` hex, as the original tooling
/// displays ids in hex.
fn parse_id(text: &str) -> anyhow::Result<u32> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("invalid station id {text:?}"))
}

pub fn handle(file: &Path, ids: &[String], english: bool, format: OutputFormat) -> anyhow::Result<()> {
    let mut reader =
        MdstReader::open_path(file).with_context(|| format!("opening {}", file.display()))?;

    let mut entries = Vec::with_capacity(ids.len());
    for text in ids {
        let id = parse_id(text)?;
        let Some(station) = reader.get(id)? else {
            entries.push(LookupEntry {
                id,
                found: false,
                station: None,
                display_name: None,
                operator: None,
                lines: Vec::new(),
            });
            continue;
        };

        let operator = match station.operator_id {
            Some(operator_id) => reader
                .resolve_operator(operator_id)?
                .name
                .preferred(false, english)
                .map(String::from),
            None => None,
        };
        let mut lines = Vec::with_capacity(station.line_ids.len());
        for &line_id in &station.line_ids {
            if let Some(name) = reader.resolve_line(line_id)?.name.preferred(false, english) {
                lines.push(name.to_string());
            }
        }

        entries.push(LookupEntry {
            id,
            found: true,
            display_name: station.name.preferred(false, english).map(String::from),
            operator,
            lines,
            station: Some(station),
        });
    }

    match format {
        OutputFormat::Text => {
            for (n, entry) in entries.iter().enumerate() {
                if n > 0 {
                    println!();
                }
                print_entry(entry);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&entries)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&entries)?),
    }

    Ok(())
}

fn print_entry(entry: &LookupEntry) {
    println!(
        "{}",
        format_key_value("Id", &format!("{} (0x{:x})", entry.id, entry.id))
    );
    let Some(station) = &entry.station else {
        println!("  not found");
        return;
    };
    if let Some(name) = &entry.display_name {
        println!("{}", format_key_value("Name", name));
    }
    if let Some(position) = &station.position {
        println!(
            "{}",
            format_key_value(
                "Position",
                &format!("{}, {}", position.latitude, position.longitude)
            )
        );
    }
    if let Some(operator) = &entry.operator {
        println!("{}", format_key_value("Operator", operator));
    }
    if !entry.lines.is_empty() {
        println!("{}", format_key_value("Lines", &entry.lines.join(", ")));
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_decimal_and_hex() {
        assert_eq!(parse_id("100").expect("decimal"), 100);
        assert_eq!(parse_id("0x64").expect("hex"), 100);
        assert_eq!(parse_id("0XFF").expect("hex"), 255);
        assert!(parse_id("banana").is_err());
        assert!(parse_id("0x").is_err());
    }
}
