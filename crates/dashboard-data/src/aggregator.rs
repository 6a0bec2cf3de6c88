//! Pure aggregations over a (possibly filtered) [`Dataset`].
//!
//! Every function is total on a well-formed dataset, never mutates its input,
//! and treats an absent column like a column of missing cells. Missing cells
//! are ignored by counts, sums and means.

use std::collections::HashMap;

use dashboard_core::formatting::format_brl;
use dashboard_core::models::{CellKey, CellValue, Dataset};
use dashboard_core::schema::KnownColumn;
use serde::Serialize;

// ── Result types ──────────────────────────────────────────────────────────────

/// How a frequency table is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyOrder {
    /// Most frequent first; ties keep first-seen order.
    ByCount,
    /// Ascending by value (numbers numerically, text lexicographically).
    ByValue,
}

/// Which end of a ranking to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    Largest,
    Smallest,
}

/// Number of rows carrying one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub value: CellValue,
    pub count: usize,
}

/// Fraction of rows carrying one value; a full table sums to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareEntry {
    pub value: CellValue,
    pub share: f64,
}

/// Sum of a numeric column within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSum {
    pub group: CellValue,
    pub total: f64,
}

/// Two-dimensional count matrix, `counts[row][column]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossTab {
    pub rows: Vec<CellValue>,
    pub columns: Vec<CellValue>,
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    /// Count at (`row`, `column`), zero for labels that are not in the table.
    pub fn get(&self, row: &CellValue, column: &CellValue) -> usize {
        let r = self.rows.iter().position(|v| v == row);
        let c = self.columns.iter().position(|v| v == column);
        match (r, c) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    /// Sum over every cell.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Largest single cell, used to scale heatmap shading.
    pub fn max(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }
}

// ── Counters ──────────────────────────────────────────────────────────────────

/// Number of records.
pub fn record_count(dataset: &Dataset) -> usize {
    dataset.len()
}

/// Number of distinct non-missing values in `column`.
pub fn distinct_count(dataset: &Dataset, column: KnownColumn) -> usize {
    let mut seen = std::collections::HashSet::new();
    dataset
        .column_values(column)
        .filter_map(CellValue::key)
        .filter(|k| seen.insert(k.clone()))
        .count()
}

/// Arithmetic mean of the numeric cells of `column`; `None` when there are none.
pub fn mean(dataset: &Dataset, column: KnownColumn) -> Option<f64> {
    let (sum, n) = dataset
        .column_values(column)
        .filter_map(CellValue::as_number)
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sum of the numeric cells of `column` (0.0 when there are none).
pub fn column_sum(dataset: &Dataset, column: KnownColumn) -> f64 {
    dataset
        .column_values(column)
        .filter_map(CellValue::as_number)
        .sum()
}

/// Sum of `column` rendered as Brazilian reais, e.g. `"R$ 1.334,56"`.
pub fn currency_total(dataset: &Dataset, column: KnownColumn) -> String {
    format_brl(column_sum(dataset, column))
}

// ── Distributions ─────────────────────────────────────────────────────────────

/// Count of records per distinct value of `column`.
pub fn frequency(dataset: &Dataset, column: KnownColumn, order: FrequencyOrder) -> Vec<FrequencyEntry> {
    let mut index: HashMap<CellKey, usize> = HashMap::new();
    let mut entries: Vec<FrequencyEntry> = Vec::new();

    for cell in dataset.column_values(column) {
        let Some(key) = cell.key() else { continue };
        match index.get(&key) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(key, entries.len());
                entries.push(FrequencyEntry {
                    value: cell.clone(),
                    count: 1,
                });
            }
        }
    }

    // `sort_by` is stable, so equal counts keep first-seen order.
    match order {
        FrequencyOrder::ByCount => entries.sort_by(|a, b| b.count.cmp(&a.count)),
        FrequencyOrder::ByValue => entries.sort_by(|a, b| a.value.sort_cmp(&b.value)),
    }
    entries
}

/// The `n` most frequent values of `column`.
pub fn most_frequent(dataset: &Dataset, column: KnownColumn, n: usize) -> Vec<FrequencyEntry> {
    let mut entries = frequency(dataset, column, FrequencyOrder::ByCount);
    entries.truncate(n);
    entries
}

/// Frequency table normalized to shares of the non-missing cells.
pub fn proportions(dataset: &Dataset, column: KnownColumn) -> Vec<ShareEntry> {
    let entries = frequency(dataset, column, FrequencyOrder::ByCount);
    let total: usize = entries.iter().map(|e| e.count).sum();
    if total == 0 {
        return Vec::new();
    }
    entries
        .into_iter()
        .map(|e| ShareEntry {
            value: e.value,
            share: e.count as f64 / total as f64,
        })
        .collect()
}

// ── Grouped sums ──────────────────────────────────────────────────────────────

/// Sum of `value` per distinct `group`, in first-seen group order.
///
/// Rows with a missing group are skipped; missing values add nothing, so a
/// group whose values are all missing sums to 0.0.
pub fn group_sums(dataset: &Dataset, group: KnownColumn, value: KnownColumn) -> Vec<GroupSum> {
    let (Some(g_idx), Some(v_idx)) = (
        dataset.column_index(group.name()),
        dataset.column_index(value.name()),
    ) else {
        return Vec::new();
    };

    let mut index: HashMap<CellKey, usize> = HashMap::new();
    let mut sums: Vec<GroupSum> = Vec::new();

    for row in dataset.rows() {
        let group_cell = &row[g_idx];
        let Some(key) = group_cell.key() else { continue };
        let amount = row[v_idx].as_number().unwrap_or(0.0);
        match index.get(&key) {
            Some(&i) => sums[i].total += amount,
            None => {
                index.insert(key, sums.len());
                sums.push(GroupSum {
                    group: group_cell.clone(),
                    total: amount,
                });
            }
        }
    }
    sums
}

/// All groups ordered by their sum; ties keep first-seen order.
pub fn ranked_group_sums(
    dataset: &Dataset,
    group: KnownColumn,
    value: KnownColumn,
    ranking: Ranking,
) -> Vec<GroupSum> {
    let mut sums = group_sums(dataset, group, value);
    match ranking {
        Ranking::Largest => sums.sort_by(|a, b| b.total.total_cmp(&a.total)),
        Ranking::Smallest => sums.sort_by(|a, b| a.total.total_cmp(&b.total)),
    }
    sums
}

/// The `n` groups with the largest (or smallest) sum of `value`.
///
/// The result has `min(n, groups)` entries.
pub fn top_groups_by_sum(
    dataset: &Dataset,
    group: KnownColumn,
    value: KnownColumn,
    n: usize,
    ranking: Ranking,
) -> Vec<GroupSum> {
    let mut sums = ranked_group_sums(dataset, group, value, ranking);
    sums.truncate(n);
    sums
}

// ── Cross-tabulation ──────────────────────────────────────────────────────────

/// Counts of `row_column` × `col_column`, each axis restricted to its `k`
/// most frequent values.
///
/// Only labels that co-occur inside the restricted subset appear; they are
/// sorted ascending. Unseen combinations are zero.
pub fn cross_tab(
    dataset: &Dataset,
    row_column: KnownColumn,
    col_column: KnownColumn,
    row_k: usize,
    col_k: usize,
) -> CrossTab {
    let (Some(r_idx), Some(c_idx)) = (
        dataset.column_index(row_column.name()),
        dataset.column_index(col_column.name()),
    ) else {
        return CrossTab::default();
    };

    let row_keys = top_keys(dataset, row_column, row_k);
    let col_keys = top_keys(dataset, col_column, col_k);

    // Pairs inside the restricted subset, in row order.
    let pairs: Vec<(&CellValue, &CellValue)> = dataset
        .rows()
        .iter()
        .map(|row| (&row[r_idx], &row[c_idx]))
        .filter(|(r, c)| {
            r.key().is_some_and(|k| row_keys.contains(&k))
                && c.key().is_some_and(|k| col_keys.contains(&k))
        })
        .collect();

    let rows = sorted_labels(pairs.iter().map(|(r, _)| *r));
    let columns = sorted_labels(pairs.iter().map(|(_, c)| *c));

    let mut counts = vec![vec![0usize; columns.len()]; rows.len()];
    for (r, c) in &pairs {
        let ri = rows.iter().position(|v| v == *r);
        let ci = columns.iter().position(|v| v == *c);
        if let (Some(ri), Some(ci)) = (ri, ci) {
            counts[ri][ci] += 1;
        }
    }

    CrossTab {
        rows,
        columns,
        counts,
    }
}

fn top_keys(dataset: &Dataset, column: KnownColumn, k: usize) -> Vec<CellKey> {
    most_frequent(dataset, column, k)
        .iter()
        .filter_map(|e| e.value.key())
        .collect()
}

fn sorted_labels<'a>(values: impl Iterator<Item = &'a CellValue>) -> Vec<CellValue> {
    let mut out: Vec<CellValue> = Vec::new();
    for v in values {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out.sort_by(|a, b| a.sort_cmp(b));
    out
}

// ── Selections ────────────────────────────────────────────────────────────────

/// Rows whose `column` holds exactly the text `value`.
pub fn select_equal(dataset: &Dataset, column: KnownColumn, value: &str) -> Dataset {
    match dataset.column_index(column.name()) {
        Some(idx) => dataset.filter_rows(|row| row[idx].as_text() == Some(value)),
        None => dataset.filter_rows(|_| false),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::ingest;

    const CSV: &str = "\
SERVICO,MUNICIPIO,VALOR_ATUAL,GRANDEZA
Link de Dados Radio,Belém,\"R$ 1.234,56\",100 MB
link de dados radio,belem,\"R$ 100,00\",20 MB
Link de Dados Fibra,Marabá,\"R$ 500,00\",100 MB
Link de Dados Fibra,Santarém,\"R$ 500,00\",N/A
Voz,Belém,,2 MB
Voz,Altamira,\"R$ 50,00\",
";

    fn dataset() -> Dataset {
        ingest(CSV).unwrap().dataset
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    // ── counters ─────────────────────────────────────────────────────────────

    #[test]
    fn test_record_and_distinct_counts() {
        let ds = dataset();
        assert_eq!(record_count(&ds), 6);
        assert_eq!(distinct_count(&ds, KnownColumn::Municipio), 4);
        assert_eq!(distinct_count(&ds, KnownColumn::Servico), 3);
        assert_eq!(distinct_count(&ds, KnownColumn::Status), 0);
    }

    #[test]
    fn test_mean_ignores_missing() {
        let ds = dataset();
        // 100, 20, 100, -, 2, -  → 222 / 4
        let m = mean(&ds, KnownColumn::BandaMb).unwrap();
        assert!((m - 55.5).abs() < 1e-9, "mean = {m}");
    }

    #[test]
    fn test_mean_without_values_is_none() {
        let ds = ingest("GRANDEZA\nN/A\n").unwrap().dataset;
        assert_eq!(mean(&ds, KnownColumn::BandaMb), None);
        assert_eq!(mean(&ds, KnownColumn::ValorAtualLimpo), None);
    }

    #[test]
    fn test_currency_total_scenario() {
        let ds = ingest(
            "SERVICO,MUNICIPIO,VALOR_ATUAL\n\
             Link de Dados Radio,Belém,\"R$ 1.234,56\"\n\
             link de dados radio,belem,\"R$ 100,00\"\n",
        )
        .unwrap()
        .dataset;
        assert_eq!(currency_total(&ds, KnownColumn::ValorAtualLimpo), "R$ 1.334,56");
    }

    #[test]
    fn test_currency_total_absent_column_is_zero() {
        let ds = ingest("SERVICO\nVoz\n").unwrap().dataset;
        assert_eq!(currency_total(&ds, KnownColumn::ValorAtualLimpo), "R$ 0,00");
    }

    // ── frequency / proportions ──────────────────────────────────────────────

    #[test]
    fn test_frequency_by_count_ties_keep_first_seen() {
        let ds = dataset();
        let freq = frequency(&ds, KnownColumn::Servico, FrequencyOrder::ByCount);
        let labels: Vec<String> = freq.iter().map(|e| e.value.to_string()).collect();
        assert_eq!(
            labels,
            vec!["LINK DE DADOS RADIO", "LINK DE DADOS FIBRA", "VOZ"]
        );
        assert!(freq.iter().all(|e| e.count == 2));
    }

    #[test]
    fn test_frequency_by_value_numeric_order() {
        let ds = dataset();
        let freq = frequency(&ds, KnownColumn::BandaMb, FrequencyOrder::ByValue);
        assert_eq!(
            freq,
            vec![
                FrequencyEntry { value: CellValue::Number(2.0), count: 1 },
                FrequencyEntry { value: CellValue::Number(20.0), count: 1 },
                FrequencyEntry { value: CellValue::Number(100.0), count: 2 },
            ]
        );
    }

    #[test]
    fn test_most_frequent_truncates() {
        let ds = dataset();
        let top = most_frequent(&ds, KnownColumn::Municipio, 1);
        assert_eq!(top, vec![FrequencyEntry { value: text("BELEM"), count: 3 }]);
    }

    #[test]
    fn test_proportions_sum_to_one() {
        let ds = dataset();
        let shares = proportions(&ds, KnownColumn::Municipio);
        let sum: f64 = shares.iter().map(|s| s.share).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(shares[0].value, text("BELEM"));
        assert!((shares[0].share - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_proportions_empty() {
        let ds = dataset().filter_rows(|_| false);
        assert!(proportions(&ds, KnownColumn::Servico).is_empty());
    }

    // ── grouped sums ─────────────────────────────────────────────────────────

    #[test]
    fn test_group_sums_first_seen_order() {
        let ds = dataset();
        let sums = group_sums(&ds, KnownColumn::Servico, KnownColumn::ValorAtualLimpo);
        assert_eq!(sums.len(), 3);
        assert_eq!(sums[0].group, text("LINK DE DADOS RADIO"));
        assert!((sums[0].total - 1334.56).abs() < 1e-9);
        assert!((sums[1].total - 1000.0).abs() < 1e-9);
        assert!((sums[2].total - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_groups_descending() {
        let ds = dataset();
        let top = top_groups_by_sum(
            &ds,
            KnownColumn::Municipio,
            KnownColumn::ValorAtualLimpo,
            15,
            Ranking::Largest,
        );
        assert_eq!(top.len(), 4);
        assert!(top.windows(2).all(|w| w[0].total >= w[1].total));
        assert_eq!(top[0].group, text("BELEM"));
    }

    #[test]
    fn test_top_groups_ties_keep_first_seen() {
        let ds = dataset();
        let top = top_groups_by_sum(
            &ds,
            KnownColumn::Municipio,
            KnownColumn::ValorAtualLimpo,
            3,
            Ranking::Largest,
        );
        // MARABA and SANTAREM both sum to 500; MARABA appears first.
        assert_eq!(top.len(), 3);
        assert_eq!(top[1].group, text("MARABA"));
        assert_eq!(top[2].group, text("SANTAREM"));
    }

    #[test]
    fn test_bottom_groups_ascending() {
        let ds = dataset();
        let bottom = top_groups_by_sum(
            &ds,
            KnownColumn::Municipio,
            KnownColumn::ValorAtualLimpo,
            2,
            Ranking::Smallest,
        );
        assert_eq!(bottom.len(), 2);
        assert_eq!(bottom[0].group, text("ALTAMIRA"));
        assert_eq!(bottom[1].group, text("MARABA"));
    }

    #[test]
    fn test_top_groups_length_is_min_of_n_and_groups() {
        let ds = dataset();
        for n in 0..6 {
            let top = top_groups_by_sum(
                &ds,
                KnownColumn::Servico,
                KnownColumn::ValorAtualLimpo,
                n,
                Ranking::Largest,
            );
            assert_eq!(top.len(), n.min(3));
        }
    }

    #[test]
    fn test_group_sums_missing_column() {
        let ds = ingest("SERVICO\nVoz\n").unwrap().dataset;
        assert!(group_sums(&ds, KnownColumn::Servico, KnownColumn::ValorAtualLimpo).is_empty());
    }

    // ── cross_tab ────────────────────────────────────────────────────────────

    #[test]
    fn test_cross_tab_counts_and_zero_fill() {
        let ds = dataset();
        let tab = cross_tab(&ds, KnownColumn::Municipio, KnownColumn::Servico, 15, 5);

        assert_eq!(
            tab.rows,
            vec![text("ALTAMIRA"), text("BELEM"), text("MARABA"), text("SANTAREM")]
        );
        assert_eq!(
            tab.columns,
            vec![text("LINK DE DADOS FIBRA"), text("LINK DE DADOS RADIO"), text("VOZ")]
        );
        assert_eq!(tab.get(&text("BELEM"), &text("LINK DE DADOS RADIO")), 2);
        assert_eq!(tab.get(&text("BELEM"), &text("VOZ")), 1);
        assert_eq!(tab.get(&text("ALTAMIRA"), &text("LINK DE DADOS FIBRA")), 0);
        assert_eq!(tab.total(), 6);
        assert_eq!(tab.max(), 2);
    }

    #[test]
    fn test_cross_tab_restricts_to_top_k() {
        let ds = dataset();
        // Top municipality: BELEM (3). Top service: LINK DE DADOS RADIO (first of the ties).
        let tab = cross_tab(&ds, KnownColumn::Municipio, KnownColumn::Servico, 1, 1);
        assert_eq!(tab.rows, vec![text("BELEM")]);
        assert_eq!(tab.columns, vec![text("LINK DE DADOS RADIO")]);
        assert_eq!(tab.counts, vec![vec![2]]);
    }

    #[test]
    fn test_cross_tab_total_matches_restricted_rows() {
        let ds = dataset();
        let (row_k, col_k) = (2, 2);
        let tab = cross_tab(&ds, KnownColumn::Municipio, KnownColumn::Servico, row_k, col_k);

        let top_rows: Vec<CellValue> = most_frequent(&ds, KnownColumn::Municipio, row_k)
            .into_iter()
            .map(|e| e.value)
            .collect();
        let top_cols: Vec<CellValue> = most_frequent(&ds, KnownColumn::Servico, col_k)
            .into_iter()
            .map(|e| e.value)
            .collect();
        let expected = (0..ds.len())
            .filter(|&i| {
                let r = ds.cell(i, KnownColumn::Municipio).unwrap();
                let c = ds.cell(i, KnownColumn::Servico).unwrap();
                top_rows.contains(r) && top_cols.contains(c)
            })
            .count();
        assert_eq!(tab.total(), expected);
    }

    #[test]
    fn test_cross_tab_absent_column() {
        let ds = ingest("MUNICIPIO\nBelém\n").unwrap().dataset;
        let tab = cross_tab(&ds, KnownColumn::Municipio, KnownColumn::Servico, 15, 5);
        assert!(tab.is_empty());
        assert_eq!(tab.total(), 0);
    }

    // ── select_equal ─────────────────────────────────────────────────────────

    #[test]
    fn test_select_equal() {
        let ds = dataset();
        let radio = select_equal(&ds, KnownColumn::Servico, "LINK DE DADOS RADIO");
        assert_eq!(radio.len(), 2);
        let none = select_equal(&ds, KnownColumn::Status, "ATIVO");
        assert!(none.is_empty());
        assert_eq!(ds.len(), 6);
    }
}
