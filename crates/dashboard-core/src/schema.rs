//! Typed view of the columns the dashboard knows about.
//!
//! The published sheet drifts over time (columns are added, renamed or
//! dropped), so every known column is optional. [`Schema::resolve`] checks the
//! normalized header row once per ingestion and derives the [`FeatureSet`] the
//! report builder consults, instead of probing column names at every step.

use serde::{Deserialize, Serialize};

/// The value type a known column is coerced to during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Free text collapsed by [`crate::text::normalize_text`].
    Categorical,
    /// Day-first date.
    Date,
    /// Brazilian-formatted money, kept as raw text.
    Currency,
    /// Floating-point number.
    Numeric,
}

/// Columns of the contract sheet that drive a transformation or a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KnownColumn {
    Status,
    Servico,
    Grandeza,
    Municipio,
    SituacaoDoContrato,
    DataInicio,
    ValorAtual,
    /// Numeric column produced from [`KnownColumn::ValorAtual`].
    ValorAtualLimpo,
    /// Explicit or derived bandwidth in megabits.
    BandaMb,
}

impl KnownColumn {
    pub const ALL: [KnownColumn; 9] = [
        KnownColumn::Status,
        KnownColumn::Servico,
        KnownColumn::Grandeza,
        KnownColumn::Municipio,
        KnownColumn::SituacaoDoContrato,
        KnownColumn::DataInicio,
        KnownColumn::ValorAtual,
        KnownColumn::ValorAtualLimpo,
        KnownColumn::BandaMb,
    ];

    /// Columns whose cells are collapsed to their canonical text form.
    pub const CATEGORICAL: [KnownColumn; 5] = [
        KnownColumn::Status,
        KnownColumn::Servico,
        KnownColumn::Grandeza,
        KnownColumn::Municipio,
        KnownColumn::SituacaoDoContrato,
    ];

    /// Normalized header name as it appears in the dataset.
    pub fn name(self) -> &'static str {
        match self {
            KnownColumn::Status => "STATUS",
            KnownColumn::Servico => "SERVICO",
            KnownColumn::Grandeza => "GRANDEZA",
            KnownColumn::Municipio => "MUNICIPIO",
            KnownColumn::SituacaoDoContrato => "SITUACAO_DO_CONTRATO",
            KnownColumn::DataInicio => "DATA_INICIO",
            KnownColumn::ValorAtual => "VALOR_ATUAL",
            KnownColumn::ValorAtualLimpo => "VALOR_ATUAL_LIMPO",
            KnownColumn::BandaMb => "BANDA_MB",
        }
    }

    pub fn value_kind(self) -> ValueKind {
        match self {
            KnownColumn::Status
            | KnownColumn::Servico
            | KnownColumn::Grandeza
            | KnownColumn::Municipio
            | KnownColumn::SituacaoDoContrato => ValueKind::Categorical,
            KnownColumn::DataInicio => ValueKind::Date,
            KnownColumn::ValorAtual => ValueKind::Currency,
            KnownColumn::ValorAtualLimpo | KnownColumn::BandaMb => ValueKind::Numeric,
        }
    }

    /// Look up a known column by its normalized name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for KnownColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which known columns a particular export carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    present: Vec<KnownColumn>,
}

impl Schema {
    /// Match normalized headers against the known columns.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut present: Vec<KnownColumn> = headers
            .iter()
            .filter_map(|h| KnownColumn::from_name(h.as_ref()))
            .collect();
        present.sort();
        present.dedup();
        Self { present }
    }

    pub fn has(&self, column: KnownColumn) -> bool {
        self.present.binary_search(&column).is_ok()
    }

    /// Register a column produced by ingestion (e.g. `VALOR_ATUAL_LIMPO`).
    pub fn add(&mut self, column: KnownColumn) {
        if let Err(pos) = self.present.binary_search(&column) {
            self.present.insert(pos, column);
        }
    }

    pub fn columns(&self) -> &[KnownColumn] {
        &self.present
    }

    /// Derive the dashboard sections this schema can feed.
    pub fn features(&self) -> FeatureSet {
        let bandwidth = self.has(KnownColumn::BandaMb);
        let service = self.has(KnownColumn::Servico);
        let municipality = self.has(KnownColumn::Municipio);
        let revenue = self.has(KnownColumn::ValorAtualLimpo);

        FeatureSet {
            bandwidth_kpi: bandwidth,
            municipality_kpi: municipality,
            bandwidth_distribution: bandwidth,
            service_share: service,
            service_municipality_rankings: service && municipality,
            revenue_by_service: service && revenue,
            municipality_revenue: municipality && revenue,
            service_municipality_heatmap: service && municipality,
        }
    }
}

/// Dashboard sections that are renderable for the current dataset.
///
/// A disabled section is skipped entirely; no placeholder is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub bandwidth_kpi: bool,
    pub municipality_kpi: bool,
    pub bandwidth_distribution: bool,
    pub service_share: bool,
    pub service_municipality_rankings: bool,
    pub revenue_by_service: bool,
    pub municipality_revenue: bool,
    pub service_municipality_heatmap: bool,
}
