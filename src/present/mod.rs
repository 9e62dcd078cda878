//! Rendering of fetched tables and analysis results.
//!
//! Nothing in here talks to the network or mutates the session; the form
//! hands over what it holds and these functions draw it (or turn it into
//! text for the prompt).

mod ui;

pub use ui::*;

use crate::types::ObservationTable;

/// Rows the preview shows when nothing else is configured.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

const COLUMN_GAP: &str = "  ";

/// The rows the preview shows: most recent `rows` periods, newest first.
pub fn preview(table: &ObservationTable, rows: usize) -> ObservationTable {
    table.most_recent(rows)
}

/// Plain-text rendering of a table for the analysis prompt.
///
/// One header line with the column names, then one line per row prefixed by
/// its row number. Every column is right-aligned to its widest entry.
pub fn table_text(table: &ObservationTable) -> String {
    if table.columns().is_empty() {
        return "Empty table".to_string();
    }

    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|s| s.chars().count())
                .fold(name.chars().count(), usize::max)
        })
        .collect();
    let index_width = table.len().saturating_sub(1).to_string().len();

    let mut out = String::new();
    out.push_str(&" ".repeat(index_width));
    for (name, width) in table.columns().iter().zip(widths.iter().copied()) {
        out.push_str(COLUMN_GAP);
        out.push_str(&format!("{name:>width$}"));
    }

    for (i, row) in cells.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!("{i:<index_width$}"));
        for (cell, width) in row.iter().zip(widths.iter().copied()) {
            out.push_str(COLUMN_GAP);
            out.push_str(&format!("{cell:>width$}"));
        }
    }
    out
}
