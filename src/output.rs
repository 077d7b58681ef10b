//! Terminal Rendering
//!
//! Plain-text rendering of inventory rows and parsing of yes/no answers.
//! Fields always appear in the order `id, name, description, qty, modified`.

use chrono::NaiveDateTime;

use crate::engine::{Item, ItemTable};

/// Timestamp format used for the `modified` column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header line: upper-cased column labels separated by ` | `
#[must_use]
pub fn render_header(columns: &[String]) -> String {
    columns.iter().map(|c| c.to_uppercase()).collect::<Vec<_>>().join(" | ")
}

/// One listing line, e.g. `#1 -> Rice: White rice, 2 bags (2024-01-01 10:00:00)`
#[must_use]
pub fn render_row(item: &Item) -> String {
    format!("{} ({})", render_entry(item), format_timestamp(item.modified))
}

/// An item without its timestamp, as shown before editing
#[must_use]
pub fn render_entry(item: &Item) -> String {
    format!("#{} -> {}: {}, {}", item.id, item.name, item.description, item.qty)
}

/// Header followed by one line per row
#[must_use]
pub fn render_table(table: &ItemTable) -> Vec<String> {
    std::iter::once(render_header(&table.columns))
        .chain(table.rows.iter().map(render_row))
        .collect()
}

#[must_use]
pub fn format_timestamp(modified: Option<NaiveDateTime>) -> String {
    modified.map_or_else(|| "-".to_string(), |ts| ts.format(TIMESTAMP_FORMAT).to_string())
}

/// An answer is affirmative when its first non-blank character is `y` or `Y`
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim_start().chars().next(), Some('y' | 'Y'))
}
