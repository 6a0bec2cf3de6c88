//! Dashboard report assembled from a filtered dataset.
//!
//! Each section is computed only when the dataset's [`FeatureSet`] enables
//! it; a disabled section is `None` and is omitted from JSON output.

use dashboard_core::models::Dataset;
use dashboard_core::schema::{FeatureSet, KnownColumn};
use serde::Serialize;
use tracing::debug;

use crate::aggregator::{
    column_sum, cross_tab, currency_total, distinct_count, frequency, mean, most_frequent,
    proportions, ranked_group_sums, select_equal, top_groups_by_sum, CrossTab, FrequencyEntry,
    FrequencyOrder, GroupSum, Ranking, ShareEntry,
};

/// Services that get their own municipality ranking.
pub const RANKED_SERVICES: [&str; 2] = ["LINK DE DADOS RADIO", "LINK DE DADOS FIBRA"];

/// Sizes of the ranked and cross-tabulated sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Municipalities listed per ranked service.
    pub top_municipalities: usize,
    /// Municipalities in the top and bottom revenue rankings.
    pub ranking_size: usize,
    /// Municipalities on the heatmap's vertical axis.
    pub heatmap_rows: usize,
    /// Services on the heatmap's horizontal axis.
    pub heatmap_cols: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_municipalities: 10,
            ranking_size: 15,
            heatmap_rows: 15,
            heatmap_cols: 5,
        }
    }
}

/// Headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_contracts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_bandwidth_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipalities: Option<usize>,
}

/// Most frequent municipalities among the contracts of one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRanking {
    pub service: String,
    pub municipalities: Vec<FrequencyEntry>,
}

/// Revenue summed per service, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRevenue {
    pub by_service: Vec<GroupSum>,
    pub total: f64,
    /// `total` formatted as Brazilian reais.
    pub total_label: String,
}

/// Municipalities with the highest and lowest revenue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityRevenue {
    pub top: Vec<GroupSum>,
    pub bottom: Vec<GroupSum>,
}

/// Everything the dashboard shows for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub features: FeatureSet,
    pub kpis: Kpis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_distribution: Option<Vec<FrequencyEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_share: Option<Vec<ShareEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_rankings: Option<Vec<ServiceRanking>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_revenue: Option<ServiceRevenue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_revenue: Option<MunicipalityRevenue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<CrossTab>,
}

/// Compute every enabled section of the dashboard for `dataset`.
pub fn build_report(dataset: &Dataset, options: &ReportOptions) -> DashboardReport {
    let features = dataset.features();

    let kpis = Kpis {
        total_contracts: dataset.len(),
        mean_bandwidth_mb: features
            .bandwidth_kpi
            .then(|| mean(dataset, KnownColumn::BandaMb))
            .flatten(),
        municipalities: features
            .municipality_kpi
            .then(|| distinct_count(dataset, KnownColumn::Municipio)),
    };

    let bandwidth_distribution = features
        .bandwidth_distribution
        .then(|| frequency(dataset, KnownColumn::BandaMb, FrequencyOrder::ByValue));

    let service_share = features
        .service_share
        .then(|| proportions(dataset, KnownColumn::Servico));

    let service_rankings = features.service_municipality_rankings.then(|| {
        RANKED_SERVICES
            .iter()
            .map(|service| {
                let subset = select_equal(dataset, KnownColumn::Servico, service);
                ServiceRanking {
                    service: service.to_string(),
                    municipalities: most_frequent(
                        &subset,
                        KnownColumn::Municipio,
                        options.top_municipalities,
                    ),
                }
            })
            .collect()
    });

    let service_revenue = features.revenue_by_service.then(|| ServiceRevenue {
        by_service: ranked_group_sums(
            dataset,
            KnownColumn::Servico,
            KnownColumn::ValorAtualLimpo,
            Ranking::Largest,
        ),
        total: column_sum(dataset, KnownColumn::ValorAtualLimpo),
        total_label: currency_total(dataset, KnownColumn::ValorAtualLimpo),
    });

    let municipality_revenue = features.municipality_revenue.then(|| {
        let rank = |ranking| {
            top_groups_by_sum(
                dataset,
                KnownColumn::Municipio,
                KnownColumn::ValorAtualLimpo,
                options.ranking_size,
                ranking,
            )
        };
        MunicipalityRevenue {
            top: rank(Ranking::Largest),
            bottom: rank(Ranking::Smallest),
        }
    });

    let heatmap = features.service_municipality_heatmap.then(|| {
        cross_tab(
            dataset,
            KnownColumn::Municipio,
            KnownColumn::Servico,
            options.heatmap_rows,
            options.heatmap_cols,
        )
    });

    debug!(
        records = kpis.total_contracts,
        ?features,
        "Dashboard report built"
    );

    DashboardReport {
        features,
        kpis,
        bandwidth_distribution,
        service_share,
        service_rankings,
        service_revenue,
        municipality_revenue,
        heatmap,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
