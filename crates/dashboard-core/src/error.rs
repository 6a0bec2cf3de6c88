use thiserror::Error;

/// All errors produced by the dashboard pipeline.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// The remote source could not be reached or answered with an error.
    #[error("Failed to fetch {source_url}: {reason}")]
    Fetch { source_url: String, reason: String },

    /// The fetched text is not well-formed CSV.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The CSV is readable but structurally inconsistent.
    #[error("Malformed CSV at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    /// The source returned no header row.
    #[error("Source returned no data: {0}")]
    EmptySource(String),

    /// A JSON document could not be produced or parsed.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for raw I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Why a single cell could not be coerced into a typed value.
///
/// Never escapes ingestion: the normalizer turns it into a missing cell and
/// bumps a counter in the ingest report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    #[error("blank cell")]
    Blank,

    #[error("not a number after cleaning: {0:?}")]
    NotANumber(String),

    #[error("not a day-first date: {0:?}")]
    NotADate(String),
}
