use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::schema::{FeatureSet, KnownColumn, Schema};

/// A single typed cell of the contract sheet.
///
/// Serialized untagged so JSON consumers see plain strings, numbers and
/// `null` for missing cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Explicit "no value" marker (blank cell or failed coercion).
    Missing,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Hashable identity of the cell, or `None` for missing cells.
    ///
    /// Numbers compare by bit pattern, with `-0.0` folded into `0.0`.
    pub fn key(&self) -> Option<CellKey> {
        match self {
            CellValue::Missing => None,
            CellValue::Number(n) => {
                let n = if *n == 0.0 { 0.0 } else { *n };
                Some(CellKey::Number(n.to_bits()))
            }
            CellValue::Date(d) => Some(CellKey::Date(*d)),
            CellValue::Text(s) => Some(CellKey::Text(s.clone())),
        }
    }

    /// Total order used for value-ordered tables: numbers ascending, then
    /// dates, then text, with missing cells last.
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        fn rank(v: &CellValue) -> u8 {
            match v {
                CellValue::Number(_) => 0,
                CellValue::Date(_) => 1,
                CellValue::Text(_) => 2,
                CellValue::Missing => 3,
            }
        }
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Missing => Ok(()),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{:.0}", n),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Hashable projection of a non-missing [`CellValue`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Number(u64),
    Date(NaiveDate),
    Text(String),
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// Normalized contract sheet: an ordered list of rows over a fixed column list.
///
/// Every row holds exactly one cell per column. A dataset is never mutated
/// after ingestion; filtering produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    #[serde(skip)]
    schema: Schema,
}

impl Dataset {
    /// Build a dataset from normalized column names and rows.
    ///
    /// Rows shorter than the header are padded with [`CellValue::Missing`];
    /// longer rows are truncated, so the column set is uniform.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Missing);
                row
            })
            .collect();
        let schema = Schema::resolve(&columns);
        Self {
            columns,
            rows,
            schema,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Dashboard sections this dataset can feed.
    pub fn features(&self) -> FeatureSet {
        self.schema.features()
    }

    pub fn has(&self, column: KnownColumn) -> bool {
        self.schema.has(column)
    }

    /// Position of a column by normalized name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom. Empty when the column is absent.
    pub fn column_values(&self, column: KnownColumn) -> impl Iterator<Item = &CellValue> + '_ {
        let idx = self.column_index(column.name());
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)))
    }

    /// Cell of `row` in `column`, if both exist.
    pub fn cell(&self, row: usize, column: KnownColumn) -> Option<&CellValue> {
        let idx = self.column_index(column.name())?;
        self.rows.get(row)?.get(idx)
    }

    /// Append a column (or replace an existing one with the same name).
    ///
    /// `values` must have one entry per row; missing entries are padded.
    pub fn with_column(mut self, name: &str, mut values: Vec<CellValue>) -> Self {
        values.resize(self.rows.len(), CellValue::Missing);
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        if let Some(known) = KnownColumn::from_name(name) {
            self.schema.add(known);
        }
        self
    }

    /// Copy of this dataset keeping only the rows `keep` accepts.
    pub fn filter_rows<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row.as_slice()))
                .cloned()
                .collect(),
            schema: self.schema.clone(),
        }
    }
}
