//! What a presenter receives.
//!
//! A [`DashboardView`] bundles the filtered dataset, its report and the
//! metadata a front end needs (filter choices, freshness, ingest counters).
//! Rendering it is the job of a [`Presenter`].

use dashboard_core::error::Result;
use dashboard_core::models::Dataset;
use dashboard_data::filter::{filter_options, FilterOptions, FilterSet};
use dashboard_data::normalizer::IngestReport;
use dashboard_data::report::{build_report, DashboardReport, ReportOptions};
use serde::Serialize;

use crate::data_manager::Snapshot;

/// One rendered state of the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// Where the data came from.
    pub source: String,
    /// The last refresh failed and this view shows an older snapshot.
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Records before filtering.
    pub total_records: usize,
    pub ingest: IngestReport,
    /// Selectable values per filter column, taken from the unfiltered data.
    pub filter_options: Vec<FilterOptions>,
    pub report: DashboardReport,
    /// Rows that passed the filters, for the raw-data table.
    #[serde(skip)]
    pub filtered: Dataset,
}

impl DashboardView {
    /// Filter `snapshot`, build the report and collect filter choices.
    pub fn build(snapshot: &Snapshot, filters: &FilterSet, options: &ReportOptions) -> Self {
        let base = snapshot.dataset.as_ref();
        let filtered = filters.apply(base);
        let report = build_report(&filtered, options);
        Self {
            source: String::new(),
            stale: false,
            last_error: None,
            total_records: base.len(),
            ingest: snapshot.ingest.clone(),
            filter_options: filter_options(base),
            report,
            filtered,
        }
    }
}

/// Renders dashboard views to some output.
pub trait Presenter {
    /// Show a freshly built view.
    fn present(&mut self, view: &DashboardView) -> Result<()>;

    /// Show a single-line message when no data could be loaded at all.
    fn present_error(&mut self, message: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::schema::KnownColumn;
    use dashboard_data::normalizer::ingest;
    use std::sync::Arc;

    fn snapshot(csv: &str) -> Snapshot {
        let ingested = ingest(csv).unwrap();
        Snapshot {
            dataset: Arc::new(ingested.dataset),
            ingest: ingested.report,
        }
    }

    #[test]
    fn test_build_applies_filters_but_keeps_all_options() {
        let snap = snapshot(crate::data_manager::tests::CSV_A);
        let filters = FilterSet::new().allow(KnownColumn::Status, ["ATIVO"]);
        let view = DashboardView::build(&snap, &filters, &ReportOptions::default());

        assert_eq!(view.total_records, 3);
        assert_eq!(view.filtered.len(), 2);
        assert_eq!(view.report.kpis.total_contracts, 2);
        let status = view
            .filter_options
            .iter()
            .find(|o| o.column == KnownColumn::Status)
            .unwrap();
        assert_eq!(status.values, vec!["ATIVO", "CANCELADO"]);
    }

    #[test]
    fn test_build_does_not_mutate_snapshot() {
        let snap = snapshot(crate::data_manager::tests::CSV_A);
        let filters = FilterSet::new().allow(KnownColumn::Status, Vec::<String>::new());
        let view = DashboardView::build(&snap, &filters, &ReportOptions::default());

        assert!(view.filtered.is_empty());
        assert_eq!(snap.dataset.len(), 3);
    }

    #[test]
    fn test_view_json_skips_rows() {
        let snap = snapshot(crate::data_manager::tests::CSV_A);
        let view = DashboardView::build(&snap, &FilterSet::new(), &ReportOptions::default());
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("filtered").is_none());
        assert!(json.get("last_error").is_none());
        assert_eq!(json["total_records"], 3);
        assert_eq!(json["report"]["kpis"]["total_contracts"], 3);
    }
}
