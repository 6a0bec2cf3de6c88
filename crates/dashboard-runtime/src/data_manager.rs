//! TTL-cached data manager for the dashboard runtime.
//!
//! Wraps a [`SourceFetcher`] and the ingestion pipeline with a time-to-live
//! cache and transparent retry logic. Callers use [`DataManager::get_data`]
//! to obtain a fresh-or-cached [`Snapshot`]; the manager handles staleness
//! checks, up to three fetch attempts with back-off, and fallback to the
//! previous snapshot when a refresh fails.
//!
//! The cache state sits behind an async mutex that is held for the whole
//! refresh, so concurrent callers trigger at most one download.

use std::sync::Arc;
use std::time::Duration;

use dashboard_core::error::Result;
use dashboard_core::models::Dataset;
use dashboard_data::normalizer::{ingest, IngestReport};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::fetcher::SourceFetcher;

/// Maximum number of fetch attempts per refresh.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// After a failed refresh, non-forced requests serve the previous snapshot
/// without fetching until this much time has passed.
pub const RETRY_AFTER_FAILURE: Duration = Duration::from_secs(30);

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// One successfully loaded version of the contract sheet.
///
/// Immutable once built; shared between callers through an [`Arc`].
#[derive(Debug)]
pub struct Snapshot {
    pub dataset: Arc<Dataset>,
    pub ingest: IngestReport,
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    loaded_at: Option<Instant>,
    failed_at: Option<Instant>,
    last_error: Option<String>,
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// TTL-cached wrapper around fetch + ingest.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use dashboard_runtime::data_manager::DataManager;
/// use dashboard_runtime::fetcher::FileFetcher;
///
/// # async fn run() -> dashboard_core::Result<()> {
/// let mgr = DataManager::new(FileFetcher::new("contratos.csv"), Duration::from_secs(3600));
/// let snapshot = mgr.get_data(false).await?;
/// println!("{} contracts", snapshot.dataset.len());
/// # Ok(())
/// # }
/// ```
pub struct DataManager<F> {
    fetcher: F,
    /// Maximum age of a snapshot before it is considered stale.
    cache_ttl: Duration,
    state: Mutex<CacheState>,
}

impl<F: SourceFetcher> DataManager<F> {
    pub fn new(fetcher: F, cache_ttl: Duration) -> Self {
        Self {
            fetcher,
            cache_ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the dataset snapshot, using the cache while it is within TTL.
    ///
    /// When `force_refresh` is `true` the cache is bypassed. If the refresh
    /// fails and a previous snapshot exists, that snapshot is returned
    /// unchanged (its age keeps growing) and the error is recorded in
    /// [`DataManager::last_error`]. The error is returned only when there is
    /// nothing to fall back to.
    ///
    /// While a previous snapshot is held, a failed refresh is not retried by
    /// non-forced calls for [`RETRY_AFTER_FAILURE`].
    pub async fn get_data(&self, force_refresh: bool) -> Result<Arc<Snapshot>> {
        let mut state = self.state.lock().await;

        if !force_refresh {
            if let Some(snapshot) = self.valid_snapshot(&state) {
                debug!("returning cached snapshot");
                return Ok(snapshot);
            }
            if let Some(snapshot) = Self::backing_off(&state) {
                debug!("last refresh failed recently; returning previous snapshot");
                return Ok(snapshot);
            }
        }

        match self.load_with_retry().await {
            Ok(snapshot) => {
                info!(
                    rows = snapshot.dataset.len(),
                    unparsed = snapshot.ingest.unparsed_cells(),
                    source = self.fetcher.describe(),
                    "dataset refreshed"
                );
                let snapshot = Arc::new(snapshot);
                state.snapshot = Some(Arc::clone(&snapshot));
                state.loaded_at = Some(Instant::now());
                state.failed_at = None;
                state.last_error = None;
                Ok(snapshot)
            }
            Err(e) => {
                state.last_error = Some(e.to_string());
                state.failed_at = Some(Instant::now());
                match &state.snapshot {
                    Some(previous) => {
                        warn!(error = %e, "refresh failed; serving previous snapshot");
                        Ok(Arc::clone(previous))
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Discard the current snapshot, forcing the next [`DataManager::get_data`]
    /// call to fetch.
    pub async fn invalidate_cache(&self) {
        let mut state = self.state.lock().await;
        state.snapshot = None;
        state.loaded_at = None;
        state.failed_at = None;
        debug!("cache invalidated");
    }

    /// Age of the current snapshot, or `None` if nothing has been loaded.
    pub async fn cache_age(&self) -> Option<Duration> {
        self.state.lock().await.loaded_at.map(|ts| ts.elapsed())
    }

    /// Description of the last refresh error, cleared by the next success.
    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn valid_snapshot(&self, state: &CacheState) -> Option<Arc<Snapshot>> {
        match (&state.snapshot, state.loaded_at) {
            (Some(snapshot), Some(ts)) if ts.elapsed() < self.cache_ttl => {
                Some(Arc::clone(snapshot))
            }
            _ => None,
        }
    }

    fn backing_off(state: &CacheState) -> Option<Arc<Snapshot>> {
        match (&state.snapshot, state.failed_at) {
            (Some(snapshot), Some(ts)) if ts.elapsed() < RETRY_AFTER_FAILURE => {
                Some(Arc::clone(snapshot))
            }
            _ => None,
        }
    }

    /// Fetch with up to [`MAX_RETRY_ATTEMPTS`] attempts, then ingest.
    ///
    /// Back-off schedule: attempt 1 → 0 ms, attempt 2 → 100 ms, attempt 3 → 200 ms.
    /// Ingestion errors are structural and are not retried.
    async fn load_with_retry(&self) -> Result<Snapshot> {
        let mut attempt = 0;
        let text = loop {
            if attempt > 0 {
                let sleep_ms = u64::from(attempt) * 100;
                debug!(attempt, sleep_ms, "retrying fetch after back-off");
                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
            }
            match self.fetcher.fetch().await {
                Ok(text) => break text,
                Err(e) => {
                    warn!(attempt, error = %e, "fetch attempt failed");
                    attempt += 1;
                    if attempt >= MAX_RETRY_ATTEMPTS {
                        return Err(e);
                    }
                }
            }
        };

        let ingested = ingest(&text)?;
        Ok(Snapshot {
            dataset: Arc::new(ingested.dataset),
            ingest: ingested.report,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
