use std::path::PathBuf;

use clap::Parser;

use crate::error::{DashboardError, Result};

/// Published CSV export of the Prodepa service-contract sheet.
pub const DEFAULT_SOURCE_URL: &str = "https://docs.google.com/spreadsheets/d/e/\
2PACX-1vStCsK-I9n6aQ6argn2xcQ1jIe5BCcvHrG5PNmq7xd13dd6i5iZovnR8ahCOzUQZztC8DlT4vYAZyRf/\
pub?gid=2120793063&single=true&output=csv";

/// How long an ingested dataset stays current (one hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Upper bound on a single source download.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Service-contract dashboard for the Prodepa spreadsheet export
#[derive(Parser, Debug, Clone)]
#[command(
    name = "prodepa-dashboard",
    about = "Service-contract dashboard for the Prodepa spreadsheet export",
    version
)]
pub struct Settings {
    /// CSV source: an http(s) URL or a local file path
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    pub source: String,

    /// Seconds an ingested dataset is reused before re-fetching
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl: u64,

    /// Download timeout in seconds (1-600)
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub fetch_timeout: u64,

    /// Keep only these STATUS values (comma separated; flag without values keeps nothing)
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub status: Option<Vec<String>>,

    /// Keep only these SERVICO values (comma separated; flag without values keeps nothing)
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub service: Option<Vec<String>>,

    /// Keep only these SITUACAO_DO_CONTRATO values (comma separated; flag without values keeps nothing)
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub situation: Option<Vec<String>>,

    /// Municipalities listed per link service (radio / fibra)
    #[arg(long, default_value_t = 10)]
    pub top_municipalities: usize,

    /// Municipalities listed in the largest / smallest revenue rankings
    #[arg(long, default_value_t = 15)]
    pub ranking_size: usize,

    /// Most frequent municipalities kept as heatmap rows
    #[arg(long, default_value_t = 15)]
    pub heatmap_rows: usize,

    /// Most frequent services kept as heatmap columns
    #[arg(long, default_value_t = 5)]
    pub heatmap_cols: usize,

    /// Filtered raw rows printed below the charts (text output)
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Re-render every N seconds until interrupted
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub watch: Option<u64>,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// `true` when the source should be read from the local filesystem.
    pub fn source_is_local(&self) -> bool {
        !(self.source.starts_with("http://") || self.source.starts_with("https://"))
    }

    /// Reject combinations clap cannot express on its own.
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(DashboardError::Config("--source must not be empty".to_string()));
        }
        if self.heatmap_rows == 0 || self.heatmap_cols == 0 {
            return Err(DashboardError::Config(
                "heatmap dimensions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
