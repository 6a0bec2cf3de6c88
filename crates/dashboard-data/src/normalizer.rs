//! Ingestion pipeline: raw CSV text to a normalized, typed [`Dataset`].
//!
//! 1. Parse the CSV ([`read_csv`]).
//! 2. Normalize header names.
//! 3. Coerce every cell according to its column's [`ValueKind`].
//! 4. Add `VALOR_ATUAL_LIMPO` next to the raw currency column.
//! 5. Derive `BANDA_MB` from `GRANDEZA` when the sheet has no explicit one.
//!
//! Cell-level coercion failures never abort the load: they become
//! [`CellValue::Missing`] and are counted in the [`IngestReport`].

use std::collections::HashSet;

use dashboard_core::coercion::{extract_bandwidth, parse_brl, parse_number, try_parse_day_first};
use dashboard_core::error::{CoercionError, Result};
use dashboard_core::models::{CellValue, Dataset};
use dashboard_core::schema::{KnownColumn, Schema, ValueKind};
use dashboard_core::text::{normalize_headers, normalize_text};
use serde::Serialize;
use tracing::{debug, warn};

use crate::reader::{read_csv, RawTable};

// ── Public types ──────────────────────────────────────────────────────────────

/// What happened while normalizing one export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Data rows in the export.
    pub rows: usize,
    /// Columns after normalization, including derived ones.
    pub columns: usize,
    /// Non-blank `DATA_INICIO` cells that are not day-first dates.
    pub unparsed_dates: usize,
    /// Non-blank `VALOR_ATUAL` cells that are not Brazilian amounts.
    pub unparsed_currency: usize,
    /// Non-blank cells of explicit numeric columns (`BANDA_MB`) that are not numbers.
    pub unparsed_numeric: usize,
    /// `BANDA_MB` was extracted from `GRANDEZA`.
    pub derived_bandwidth: bool,
    /// Known source columns the export does not carry.
    pub absent_columns: Vec<KnownColumn>,
    /// Normalized header names that occur more than once.
    pub duplicate_columns: Vec<String>,
}

impl IngestReport {
    /// Total cells that fell back to a missing value because of bad content.
    pub fn unparsed_cells(&self) -> usize {
        self.unparsed_dates + self.unparsed_currency + self.unparsed_numeric
    }
}

/// A normalized dataset together with its [`IngestReport`].
#[derive(Debug, Clone)]
pub struct Ingested {
    pub dataset: Dataset,
    pub report: IngestReport,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Parse and normalize a CSV export.
///
/// Fails only on structural problems (see [`read_csv`]).
pub fn ingest(text: &str) -> Result<Ingested> {
    let raw = read_csv(text)?;
    Ok(normalize_table(raw))
}

/// Normalize an already-parsed table. Never fails.
pub fn normalize_table(raw: RawTable) -> Ingested {
    let mut report = IngestReport {
        rows: raw.rows.len(),
        ..IngestReport::default()
    };

    // ── Step 1: Headers ───────────────────────────────────────────────────────
    let columns = normalize_headers(&raw.headers);
    report.duplicate_columns = duplicates(&columns);
    if !report.duplicate_columns.is_empty() {
        warn!(
            "Duplicate columns after normalization: {:?}; the first occurrence wins",
            report.duplicate_columns
        );
    }

    let kinds: Vec<Option<KnownColumn>> =
        columns.iter().map(|c| KnownColumn::from_name(c)).collect();

    // ── Step 2: Cells ─────────────────────────────────────────────────────────
    let mut rows = Vec::with_capacity(raw.rows.len());
    for raw_row in &raw.rows {
        let row: Vec<CellValue> = raw_row
            .iter()
            .zip(&kinds)
            .map(|(cell, kind)| coerce_cell(cell, *kind, &mut report))
            .collect();
        rows.push(row);
    }

    let mut dataset = Dataset::new(columns, rows);

    // ── Step 3: Clean currency ────────────────────────────────────────────────
    if dataset.has(KnownColumn::ValorAtual) {
        let cleaned: Vec<CellValue> = raw_column(&raw, KnownColumn::ValorAtual)
            .map(|cell| match parse_brl(cell) {
                Ok(v) => CellValue::Number(v),
                Err(CoercionError::Blank) => CellValue::Missing,
                Err(e) => {
                    debug!("VALOR_ATUAL cell rejected: {}", e);
                    report.unparsed_currency += 1;
                    CellValue::Missing
                }
            })
            .collect();
        dataset = dataset.with_column(KnownColumn::ValorAtualLimpo.name(), cleaned);
    }

    // ── Step 4: Derived bandwidth ─────────────────────────────────────────────
    if !dataset.has(KnownColumn::BandaMb) && dataset.has(KnownColumn::Grandeza) {
        let derived: Vec<CellValue> = dataset
            .column_values(KnownColumn::Grandeza)
            .map(|cell| match cell.as_text().and_then(extract_bandwidth) {
                Some(mb) => CellValue::Number(mb),
                None => CellValue::Missing,
            })
            .collect();
        dataset = dataset.with_column(KnownColumn::BandaMb.name(), derived);
        report.derived_bandwidth = true;
    }

    // ── Step 5: Report ────────────────────────────────────────────────────────
    report.columns = dataset.columns().len();
    report.absent_columns = absent_source_columns(dataset.schema());

    if report.unparsed_cells() > 0 {
        warn!(
            dates = report.unparsed_dates,
            currency = report.unparsed_currency,
            numeric = report.unparsed_numeric,
            "Some cells could not be coerced and were left empty"
        );
    }
    debug!(
        rows = report.rows,
        columns = report.columns,
        derived_bandwidth = report.derived_bandwidth,
        "Dataset normalized"
    );

    Ingested { dataset, report }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Coerce one raw cell according to the kind of its column.
fn coerce_cell(raw: &str, column: Option<KnownColumn>, report: &mut IngestReport) -> CellValue {
    let Some(column) = column else {
        return plain_text(raw);
    };

    match column.value_kind() {
        // Blank categorical cells stay selectable as the empty category.
        ValueKind::Categorical => CellValue::Text(normalize_text(raw)),
        ValueKind::Date => match try_parse_day_first(raw) {
            Ok(date) => CellValue::Date(date),
            Err(CoercionError::Blank) => CellValue::Missing,
            Err(e) => {
                debug!("{} cell rejected: {}", column, e);
                report.unparsed_dates += 1;
                CellValue::Missing
            }
        },
        // The raw amount is kept for display; the numeric copy is added later.
        ValueKind::Currency => plain_text(raw),
        ValueKind::Numeric => match parse_number(raw) {
            Ok(v) => CellValue::Number(v),
            Err(CoercionError::Blank) => CellValue::Missing,
            Err(e) => {
                debug!("{} cell rejected: {}", column, e);
                report.unparsed_numeric += 1;
                CellValue::Missing
            }
        },
    }
}

fn plain_text(raw: &str) -> CellValue {
    if raw.trim().is_empty() {
        CellValue::Missing
    } else {
        CellValue::Text(raw.to_string())
    }
}

/// Raw (pre-normalization) cells of a known column, first occurrence.
fn raw_column<'a>(raw: &'a RawTable, column: KnownColumn) -> impl Iterator<Item = &'a str> + 'a {
    let idx = normalize_headers(&raw.headers)
        .iter()
        .position(|h| h == column.name());
    raw.rows
        .iter()
        .map(move |row| idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or(""))
}

fn duplicates(columns: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for c in columns {
        if !seen.insert(c.as_str()) && !dups.contains(c) {
            dups.push(c.clone());
        }
    }
    dups
}

/// Source columns (not derived ones) that the export lacks.
fn absent_source_columns(schema: &Schema) -> Vec<KnownColumn> {
    KnownColumn::ALL
        .into_iter()
        .filter(|c| !matches!(c, KnownColumn::ValorAtualLimpo | KnownColumn::BandaMb))
        .filter(|c| !schema.has(*c))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
