mod bootstrap;
mod presenter;
mod table;

use std::io::Stdout;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dashboard_core::schema::KnownColumn;
use dashboard_core::settings::Settings;
use dashboard_data::filter::FilterSet;
use dashboard_data::report::ReportOptions;
use dashboard_runtime::data_manager::DataManager;
use dashboard_runtime::fetcher::{FileFetcher, HttpFetcher, SourceFetcher};
use dashboard_runtime::orchestrator::{DashboardOrchestrator, DashboardUpdate, RenderStatus};
use dashboard_runtime::view::Presenter;

use crate::presenter::{JsonPresenter, TextPresenter};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = Settings::parse();
    match run(settings).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<ExitCode> {
    settings.validate()?;
    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_deref())?;

    tracing::info!("Prodepa dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Source: {}, cache TTL: {}s, format: {}",
        settings.source,
        settings.cache_ttl,
        settings.format
    );

    let ttl = Duration::from_secs(settings.cache_ttl);
    if settings.source_is_local() {
        let manager = DataManager::new(FileFetcher::new(&settings.source), ttl);
        serve(manager, &settings).await
    } else {
        let timeout = Duration::from_secs(settings.fetch_timeout);
        let manager = DataManager::new(HttpFetcher::new(settings.source.clone(), timeout)?, ttl);
        serve(manager, &settings).await
    }
}

async fn serve<F: SourceFetcher + 'static>(manager: DataManager<F>, settings: &Settings) -> Result<ExitCode> {
    let orchestrator =
        DashboardOrchestrator::new(manager, build_filters(settings), report_options(settings));

    match settings.format.as_str() {
        "json" => {
            let presenter: JsonPresenter<Stdout> = JsonPresenter::new(std::io::stdout(), settings.rows);
            drive(orchestrator, presenter, settings.watch).await
        }
        _ => {
            let presenter: TextPresenter<Stdout> = TextPresenter::new(std::io::stdout(), settings.rows);
            drive(orchestrator, presenter, settings.watch).await
        }
    }
}

/// Render once, or keep re-rendering every `watch` seconds until Ctrl+C.
async fn drive<F, P>(
    orchestrator: DashboardOrchestrator<F>,
    mut presenter: P,
    watch: Option<u64>,
) -> Result<ExitCode>
where
    F: SourceFetcher + 'static,
    P: Presenter,
{
    let Some(secs) = watch else {
        let status = orchestrator.render_once(&mut presenter, false).await?;
        return Ok(match status {
            RenderStatus::Failed => ExitCode::FAILURE,
            RenderStatus::Fresh | RenderStatus::Stale => ExitCode::SUCCESS,
        });
    };

    tracing::info!("Refreshing every {}s; press Ctrl+C to stop", secs);
    let (mut rx, handle) = orchestrator.start(Duration::from_secs(secs));

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Some(DashboardUpdate::View(view)) => presenter.present(&view)?,
                Some(DashboardUpdate::Failed(message)) => presenter.present_error(&message)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; stopping refresh loop");
                break;
            }
        }
    }

    handle.abort();
    Ok(ExitCode::SUCCESS)
}

fn build_filters(settings: &Settings) -> FilterSet {
    FilterSet::new()
        .allow_opt(KnownColumn::Status, settings.status.as_deref())
        .allow_opt(KnownColumn::Servico, settings.service.as_deref())
        .allow_opt(KnownColumn::SituacaoDoContrato, settings.situation.as_deref())
}

fn report_options(settings: &Settings) -> ReportOptions {
    ReportOptions {
        top_municipalities: settings.top_municipalities,
        ranking_size: settings.ranking_size,
        heatmap_rows: settings.heatmap_rows,
        heatmap_cols: settings.heatmap_cols,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
