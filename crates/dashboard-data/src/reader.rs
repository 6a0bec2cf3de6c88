//! CSV loading for the published contract sheet.
//!
//! Turns the raw export text into a [`RawTable`] of untyped string cells.
//! Structural problems (no header, rows wider than the header, broken
//! quoting) are fatal for the whole load; typed coercion happens later in
//! [`crate::normalizer`].

use csv::ReaderBuilder;
use dashboard_core::error::{DashboardError, Result};
use tracing::debug;

/// Header row plus data rows, exactly as they appear in the export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    /// Every row has `headers.len()` cells; short rows are padded with `""`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse comma-separated text with a header row.
///
/// * A leading UTF-8 byte-order mark is ignored.
/// * Blank lines are skipped.
/// * Rows with fewer cells than the header are padded with empty cells.
/// * Rows with more cells than the header are rejected with
///   [`DashboardError::Malformed`].
pub fn read_csv(text: &str) -> Result<RawTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DashboardError::EmptySource("no header row".to_string()));
    }

    let width = headers.len();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(DashboardError::Malformed {
                line,
                reason: format!("expected {} fields, found {}", width, record.len()),
            });
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    debug!("Read {} rows x {} columns from CSV", rows.len(), width);

    Ok(RawTable { headers, rows })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
