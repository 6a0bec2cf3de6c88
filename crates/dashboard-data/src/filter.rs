//! Set-membership filters over the categorical filter columns.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use dashboard_core::models::Dataset;
use dashboard_core::schema::KnownColumn;
use dashboard_core::text::normalize_text;
use serde::Serialize;

/// Columns the presentation layer offers as multi-select filters.
pub const FILTER_COLUMNS: [KnownColumn; 3] = [
    KnownColumn::Status,
    KnownColumn::Servico,
    KnownColumn::SituacaoDoContrato,
];

/// Allowed values per filter column, combined with logical AND.
///
/// A column without an entry is unfiltered. A column with an *empty* allowed
/// set keeps no rows at all, which lets a caller deliberately exclude every
/// row of a category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    allowed: BTreeMap<KnownColumn, BTreeSet<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `column` to `values`. Values are normalized before storing, so
    /// `"Belém"` and `"BELEM"` select the same rows.
    pub fn allow<I, S>(mut self, column: KnownColumn, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = values
            .into_iter()
            .map(|v| normalize_text(v.as_ref()))
            .collect();
        self.allowed.insert(column, set);
        self
    }

    /// Same as [`FilterSet::allow`] but leaves the column unfiltered on `None`.
    pub fn allow_opt<S: AsRef<str>>(self, column: KnownColumn, values: Option<&[S]>) -> Self {
        match values {
            Some(values) => self.allow(column, values.iter()),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Allowed values for `column`, if it is filtered.
    pub fn allowed(&self, column: KnownColumn) -> Option<&BTreeSet<String>> {
        self.allowed.get(&column)
    }

    /// Rows of `dataset` that satisfy every filter.
    ///
    /// Filters on columns the dataset does not carry are ignored. The input is
    /// left untouched.
    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        let active: Vec<(usize, &BTreeSet<String>)> = self
            .allowed
            .iter()
            .filter_map(|(column, set)| dataset.column_index(column.name()).map(|idx| (idx, set)))
            .collect();

        if active.is_empty() {
            return dataset.clone();
        }

        dataset.filter_rows(|row| {
            active.iter().all(|(idx, set)| {
                row.get(*idx)
                    .and_then(|cell| cell.as_text())
                    .is_some_and(|value| set.contains(value))
            })
        })
    }
}

/// Selectable values of one filter column, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub column: KnownColumn,
    pub values: Vec<String>,
}

/// Option lists for every filter column the dataset carries.
pub fn filter_options(dataset: &Dataset) -> Vec<FilterOptions> {
    FILTER_COLUMNS
        .into_iter()
        .filter(|column| dataset.has(*column))
        .map(|column| {
            let mut seen = HashSet::new();
            let values = dataset
                .column_values(column)
                .filter_map(|cell| cell.as_text())
                .filter(|v| seen.insert(*v))
                .map(str::to_string)
                .collect();
            FilterOptions { column, values }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
