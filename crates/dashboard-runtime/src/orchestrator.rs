//! Dashboard orchestrator.
//!
//! Ties the [`DataManager`] to the filter and report settings chosen at start
//! up. [`DashboardOrchestrator::render_once`] serves a single request;
//! [`DashboardOrchestrator::start`] runs the periodic refresh loop in a tokio
//! task and forwards every result through an `mpsc` channel.

use std::sync::Arc;
use std::time::Duration;

use dashboard_core::error::Result;
use dashboard_data::filter::FilterSet;
use dashboard_data::report::ReportOptions;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, warn};

use crate::data_manager::DataManager;
use crate::fetcher::SourceFetcher;
use crate::view::{DashboardView, Presenter};

// ── Public types ──────────────────────────────────────────────────────────────

/// Outcome of one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// The view reflects data within its TTL.
    Fresh,
    /// The last refresh failed; an older snapshot was shown.
    Stale,
    /// No data at all; the presenter got an error message instead.
    Failed,
}

/// One message from the refresh loop.
#[derive(Debug, Clone)]
pub enum DashboardUpdate {
    View(Box<DashboardView>),
    Failed(String),
}

// ── DashboardOrchestrator ─────────────────────────────────────────────────────

pub struct DashboardOrchestrator<F> {
    manager: Arc<DataManager<F>>,
    filters: FilterSet,
    options: ReportOptions,
}

impl<F> DashboardOrchestrator<F>
where
    F: SourceFetcher + 'static,
{
    pub fn new(manager: DataManager<F>, filters: FilterSet, options: ReportOptions) -> Self {
        Self {
            manager: Arc::new(manager),
            filters,
            options,
        }
    }

    /// Load (or reuse) the dataset and build the filtered view.
    pub async fn refresh(&self, force: bool) -> Result<DashboardView> {
        let snapshot = self.manager.get_data(force).await?;
        let last_error = self.manager.last_error().await;

        let mut view = DashboardView::build(&snapshot, &self.filters, &self.options);
        view.source = self.manager.fetcher().describe().to_string();
        view.stale = last_error.is_some();
        view.last_error = last_error;
        Ok(view)
    }

    /// Build one view and hand it to `presenter`.
    ///
    /// A load failure is reported through [`Presenter::present_error`] and
    /// yields [`RenderStatus::Failed`]; only presenter errors are returned as
    /// `Err`.
    pub async fn render_once<P: Presenter>(&self, presenter: &mut P, force: bool) -> Result<RenderStatus> {
        match self.refresh(force).await {
            Ok(view) => {
                presenter.present(&view)?;
                Ok(if view.stale {
                    RenderStatus::Stale
                } else {
                    RenderStatus::Fresh
                })
            }
            Err(e) => {
                error!(error = %e, "unable to load dashboard data");
                presenter.present_error(&e.to_string())?;
                Ok(RenderStatus::Failed)
            }
        }
    }

    /// Start the refresh loop.
    ///
    /// Spawns a tokio task that builds a view immediately and then once per
    /// `interval`. Returns:
    /// - An `mpsc::Receiver<DashboardUpdate>` for the caller to poll.
    /// - A [`RefreshHandle`] that can be used to abort the loop.
    pub fn start(self, interval: Duration) -> (mpsc::Receiver<DashboardUpdate>, RefreshHandle) {
        let (tx, rx) = mpsc::channel(4);

        let handle = tokio::spawn(async move {
            self.refresh_loop(interval, tx).await;
        });

        (rx, RefreshHandle { handle })
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Exits when the receiver side of the channel is closed.
    async fn refresh_loop(self, interval: Duration, tx: mpsc::Sender<DashboardUpdate>) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if tx.is_closed() {
                debug!("dashboard channel closed; exiting loop");
                break;
            }

            let update = match self.refresh(false).await {
                Ok(view) => DashboardUpdate::View(Box::new(view)),
                Err(e) => DashboardUpdate::Failed(e.to_string()),
            };

            if tx.send(update).await.is_err() {
                warn!("failed to send dashboard update; receiver dropped");
                break;
            }
        }
    }
}

// ── RefreshHandle ─────────────────────────────────────────────────────────────

/// A handle to the background refresh task.
pub struct RefreshHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl RefreshHandle {
    /// Immediately abort the refresh loop.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_manager::tests::{ScriptedFetcher, CSV_A};
    use dashboard_core::schema::KnownColumn;

    #[derive(Default)]
    struct RecordingPresenter {
        views: Vec<DashboardView>,
        errors: Vec<String>,
    }

    impl Presenter for RecordingPresenter {
        fn present(&mut self, view: &DashboardView) -> Result<()> {
            self.views.push(view.clone());
            Ok(())
        }

        fn present_error(&mut self, message: &str) -> Result<()> {
            self.errors.push(message.to_string());
            Ok(())
        }
    }

    fn orchestrator(
        script: Vec<Option<&'static str>>,
        filters: FilterSet,
    ) -> DashboardOrchestrator<ScriptedFetcher> {
        let manager = DataManager::new(ScriptedFetcher::new(script), Duration::from_secs(3600));
        DashboardOrchestrator::new(manager, filters, ReportOptions::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_once_fresh() {
        let orch = orchestrator(
            vec![Some(CSV_A)],
            FilterSet::new().allow(KnownColumn::Servico, ["VOZ"]),
        );
        let mut presenter = RecordingPresenter::default();

        let status = orch.render_once(&mut presenter, false).await.unwrap();

        assert_eq!(status, RenderStatus::Fresh);
        assert_eq!(presenter.views.len(), 1);
        let view = &presenter.views[0];
        assert_eq!(view.source, "scripted");
        assert_eq!(view.total_records, 3);
        assert_eq!(view.filtered.len(), 1);
        assert!(!view.stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_once_without_data_presents_error() {
        let orch = orchestrator(vec![None], FilterSet::new());
        let mut presenter = RecordingPresenter::default();

        let status = orch.render_once(&mut presenter, false).await.unwrap();

        assert_eq!(status, RenderStatus::Failed);
        assert!(presenter.views.is_empty());
        assert_eq!(presenter.errors.len(), 1);
        assert!(presenter.errors[0].contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_once_stale_after_failed_refresh() {
        let orch = orchestrator(vec![Some(CSV_A), None], FilterSet::new());
        let mut presenter = RecordingPresenter::default();

        orch.render_once(&mut presenter, false).await.unwrap();
        let status = orch.render_once(&mut presenter, true).await.unwrap();

        assert_eq!(status, RenderStatus::Stale);
        let view = presenter.views.last().unwrap();
        assert!(view.stale);
        assert!(view.last_error.is_some());
        assert_eq!(view.total_records, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_sends_updates() {
        let orch = orchestrator(vec![Some(CSV_A)], FilterSet::new());
        let (mut rx, handle) = orch.start(Duration::from_secs(60));

        for _ in 0..2 {
            match rx.recv().await {
                Some(DashboardUpdate::View(view)) => assert_eq!(view.total_records, 3),
                other => panic!("unexpected update: {other:?}"),
            }
        }

        drop(rx);
        time::sleep(Duration::from_secs(120)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_reports_failures() {
        let orch = orchestrator(vec![None], FilterSet::new());
        let (mut rx, handle) = orch.start(Duration::from_secs(60));

        match rx.recv().await {
            Some(DashboardUpdate::Failed(message)) => assert!(message.contains("connection reset")),
            other => panic!("unexpected update: {other:?}"),
        }
        handle.abort();
    }
}
