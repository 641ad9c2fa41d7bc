//! Output formatting utilities for the CLI

use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table, presets};

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    table
}

/// Style a header cell
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .add_attribute(Attribute::Bold)
        .set_alignment(CellAlignment::Left)
}

/// Style a regular text cell
pub fn regular_cell(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Left)
}

/// Style a numeric cell (right-aligned)
pub fn numeric_cell(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Format a key/value pair for plain-text output
pub fn format_key_value(key: &str, value: &str) -> String {
    format!("{key}: {value}")
}
