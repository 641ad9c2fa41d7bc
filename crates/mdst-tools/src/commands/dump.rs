//! `mdst dump` — list every station

use crate::OutputFormat;
use crate::output::{create_table, header_cell, numeric_cell, regular_cell};
use anyhow::Context;
use mdst_format::{MdstReader, Station};
use std::path::Path;

pub fn handle(file: &Path, limit: Option<usize>, format: OutputFormat) -> anyhow::Result<()> {
    let mut reader =
        MdstReader::open_path(file).with_context(|| format!("opening {}", file.display()))?;

    let limit = limit.unwrap_or(usize::MAX);
    let stations = reader
        .stations()?
        .take(limit)
        .collect::<Result<Vec<Station>, _>>()
        .context("station section is corrupt")?;

    match format {
        OutputFormat::Text => {
            let mut table = create_table();
            table.set_header(vec![
                header_cell("Id"),
                header_cell("Name"),
                header_cell("Position"),
                header_cell("Operator"),
                header_cell("Lines"),
            ]);
            for station in &stations {
                table.add_row(vec![
                    numeric_cell(&station.id.to_string()),
                    regular_cell(station.name.preferred(false, true).unwrap_or("-")),
                    regular_cell(&station.position.map_or_else(
                        || "-".to_string(),
                        |p| format!("{}, {}", p.latitude, p.longitude),
                    )),
                    regular_cell(
                        &station
                            .operator_id
                            .map_or_else(|| "-".to_string(), |id| id.to_string()),
                    ),
                    regular_cell(&if station.line_ids.is_empty() {
                        "-".to_string()
                    } else {
                        station
                            .line_ids
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    }),
                ]);
            }
            println!("{table}");
            println!("{} stations", stations.len());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&stations)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&stations)?),
    }

    Ok(())
}
