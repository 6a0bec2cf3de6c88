//! Terminal and JSON presenters for dashboard views.

use std::io::Write;

use dashboard_core::error::Result;
use dashboard_core::formatting::{format_brl, format_number_br, format_share};
use dashboard_core::models::CellValue;
use dashboard_data::aggregator::{CrossTab, GroupSum};
use dashboard_runtime::view::{DashboardView, Presenter};
use serde::Serialize;

use crate::table::{bar, Align, TextTable};

const BAR_WIDTH: usize = 30;

/// Heatmap shading, lightest to darkest.
const SHADES: [char; 5] = ['·', '░', '▒', '▓', '█'];

fn label(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) if s.is_empty() => "(blank)".to_string(),
        other => other.to_string(),
    }
}

// ── Text ──────────────────────────────────────────────────────────────────────

/// Human-readable report with aligned tables.
pub struct TextPresenter<W: Write> {
    out: W,
    /// Raw rows printed below the aggregates.
    max_rows: usize,
}

impl<W: Write> TextPresenter<W> {
    pub fn new(out: W, max_rows: usize) -> Self {
        Self { out, max_rows }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn section(&mut self, title: &str, body: &str) -> Result<()> {
        writeln!(self.out, "\n== {title} ==")?;
        writeln!(self.out, "{body}")?;
        Ok(())
    }

    fn revenue_table(rows: &[GroupSum], group_header: &str) -> TextTable {
        let mut table = TextTable::new([group_header, "Revenue"]).align(1, Align::Right);
        for row in rows {
            table.push([label(&row.group), format_brl(row.total)]);
        }
        table
    }

    fn heatmap(tab: &CrossTab) -> String {
        let max = tab.max();
        let mut headers = vec!["Municipality".to_string()];
        headers.extend(tab.columns.iter().map(label));
        let mut table = TextTable::new(headers);
        for col in 1..=tab.columns.len() {
            table = table.align(col, Align::Right);
        }
        for (row_label, counts) in tab.rows.iter().zip(&tab.counts) {
            let mut cells = vec![label(row_label)];
            cells.extend(counts.iter().map(|&n| {
                let shade = if max == 0 || n == 0 {
                    SHADES[0]
                } else {
                    let top = SHADES.len() - 1;
                    SHADES[(n * top).div_ceil(max).clamp(1, top)]
                };
                format!("{n} {shade}")
            }));
            table.push(cells);
        }
        table.render()
    }
}

impl<W: Write> Presenter for TextPresenter<W> {
    fn present(&mut self, view: &DashboardView) -> Result<()> {
        let report = &view.report;

        writeln!(self.out, "Prodepa service contracts")?;
        writeln!(self.out, "Source: {}", view.source)?;
        if let Some(err) = view.last_error.as_deref().filter(|_| view.stale) {
            writeln!(self.out, "WARNING: showing cached data, last refresh failed: {err}")?;
        }
        writeln!(
            self.out,
            "Records: {} of {}",
            report.kpis.total_contracts, view.total_records
        )?;
        if view.ingest.unparsed_cells() > 0 {
            writeln!(
                self.out,
                "Unreadable cells left empty: {} date, {} currency, {} numeric",
                view.ingest.unparsed_dates, view.ingest.unparsed_currency, view.ingest.unparsed_numeric
            )?;
        }

        // ── KPIs ──────────────────────────────────────────────────────────────
        let mut kpis = TextTable::new(["Indicator", "Value"]).align(1, Align::Right);
        kpis.push(["Total contracts".to_string(), report.kpis.total_contracts.to_string()]);
        if report.features.bandwidth_kpi {
            let mean = report
                .kpis
                .mean_bandwidth_mb
                .map(|m| format_number_br(m, 1))
                .unwrap_or_else(|| "-".to_string());
            kpis.push(["Mean bandwidth (MB)".to_string(), mean]);
        }
        if let Some(n) = report.kpis.municipalities {
            kpis.push(["Municipalities served".to_string(), n.to_string()]);
        }
        self.section("Overview", &kpis.render())?;

        // ── Distributions ─────────────────────────────────────────────────────
        if let Some(dist) = &report.bandwidth_distribution {
            let max = dist.iter().map(|e| e.count).max().unwrap_or(0) as f64;
            let mut table = TextTable::new(["Bandwidth (MB)", "Contracts", ""])
                .align(0, Align::Right)
                .align(1, Align::Right);
            for entry in dist {
                table.push([
                    label(&entry.value),
                    entry.count.to_string(),
                    bar(entry.count as f64, max, BAR_WIDTH),
                ]);
            }
            self.section("Bandwidth distribution", &table.render())?;
        }

        if let Some(shares) = &report.service_share {
            let mut table = TextTable::new(["Service", "Share", ""]).align(1, Align::Right);
            for entry in shares {
                table.push([
                    label(&entry.value),
                    format_share(entry.share),
                    bar(entry.share, 1.0, BAR_WIDTH),
                ]);
            }
            self.section("Service share", &table.render())?;
        }

        if let Some(rankings) = &report.service_rankings {
            for ranking in rankings {
                let mut table = TextTable::new(["Municipality", "Contracts"]).align(1, Align::Right);
                for entry in &ranking.municipalities {
                    table.push([label(&entry.value), entry.count.to_string()]);
                }
                let title = format!("Top municipalities: {}", ranking.service);
                let body = if table.is_empty() {
                    "(no contracts)".to_string()
                } else {
                    table.render()
                };
                self.section(&title, &body)?;
            }
        }

        // ── Revenue ───────────────────────────────────────────────────────────
        if let Some(revenue) = &report.service_revenue {
            let mut table = Self::revenue_table(&revenue.by_service, "Service");
            table.push(["TOTAL".to_string(), revenue.total_label.clone()]);
            self.section("Revenue by service", &table.render())?;
        }

        if let Some(muni) = &report.municipality_revenue {
            let top = Self::revenue_table(&muni.top, "Municipality");
            self.section("Highest revenue municipalities", &top.render())?;
            let bottom = Self::revenue_table(&muni.bottom, "Municipality");
            self.section("Lowest revenue municipalities", &bottom.render())?;
        }

        // ── Heatmap ───────────────────────────────────────────────────────────
        if let Some(tab) = &report.heatmap {
            let body = if tab.is_empty() {
                "(no data)".to_string()
            } else {
                Self::heatmap(tab)
            };
            self.section("Contracts by municipality and service", &body)?;
        }

        // ── Raw rows ──────────────────────────────────────────────────────────
        let dataset = &view.filtered;
        let shown = dataset.len().min(self.max_rows);
        if shown > 0 {
            let mut table = TextTable::new(dataset.columns().iter().cloned());
            for row in &dataset.rows()[..shown] {
                table.push(row.iter().map(ToString::to_string));
            }
            let title = format!("Filtered rows ({shown} of {})", dataset.len());
            self.section(&title, &table.render())?;
        }

        self.out.flush()?;
        Ok(())
    }

    fn present_error(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "Error: {message}")?;
        self.out.flush()?;
        Ok(())
    }
}

// ── JSON ──────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonDocument<'a> {
    #[serde(flatten)]
    view: &'a DashboardView,
    columns: &'a [String],
    rows: &'a [Vec<CellValue>],
}

#[derive(Serialize)]
struct JsonError<'a> {
    error: &'a str,
}

/// One JSON document per line, for piping into other tools.
pub struct JsonPresenter<W: Write> {
    out: W,
    max_rows: usize,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W, max_rows: usize) -> Self {
        Self { out, max_rows }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn present(&mut self, view: &DashboardView) -> Result<()> {
        let dataset = &view.filtered;
        let shown = dataset.len().min(self.max_rows);
        let doc = JsonDocument {
            view,
            columns: dataset.columns(),
            rows: &dataset.rows()[..shown],
        };
        serde_json::to_writer(&mut self.out, &doc)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    fn present_error(&mut self, message: &str) -> Result<()> {
        serde_json::to_writer(&mut self.out, &JsonError { error: message })?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
