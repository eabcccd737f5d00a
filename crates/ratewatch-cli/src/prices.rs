//! Price run handlers for the CLI.
//!
//! A run selects hotels from the registry, drives the scraper through the
//! WebDriver factory, and hands the snapshots to a [`SnapshotSink`]. Hotel
//! failures never abort a run; only setup errors do, and those are turned
//! into an unsuccessful [`RunOutcome`] instead of being propagated.

use std::path::{Path, PathBuf};

use clap::Args;
use ratewatch_core::{AppConfig, HotelTarget, PriceSnapshot, RunStats, StrategyMode};
use ratewatch_scraper::calendar::locate_payload_observations;
use ratewatch_scraper::dates::today;
use ratewatch_scraper::procedure::assemble_snapshots;
use ratewatch_scraper::{
    build_window, collect_prices, OrchestratorConfig, PriceRequest, TracingObserver,
    WebDriverConfig, WebDriverFactory,
};

use crate::sink::{JsonSnapshotSink, SnapshotSink};

/// Hotels per scheduled session slot.
pub(crate) const SLOT_SIZE: usize = 3;

/// Id given to the ad-hoc hotel of `prices url`.
pub(crate) const TEST_URL_HOTEL_ID: &str = "test-url";

/// Snapshots echoed to stdout by `prices url`.
const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, Default, Args)]
pub(crate) struct RunArgs {
    /// Session slot: 1 = hotels 1-3, 2 = hotels 4-6. All hotels when omitted.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub(crate) session: Option<u8>,
    /// Keep at most N of the selected hotels
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Number of check-in dates per hotel, starting tomorrow (default 30)
    #[arg(long, conflicts_with = "j_plus")]
    pub(crate) dates: Option<usize>,
    /// Only the check-in date N days from today
    #[arg(long = "j-plus")]
    pub(crate) j_plus: Option<i64>,
    /// isolated|shared|parallel, or 1|2|3
    #[arg(long)]
    pub(crate) strategy: Option<StrategyMode>,
    /// Pool width for the parallel strategy
    #[arg(long)]
    pub(crate) workers: Option<usize>,
    /// Write snapshots to this file instead of the configured destination
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// Quick check: first hotel only, three dates
    #[arg(long, conflicts_with_all = ["session", "limit", "dates", "j_plus"])]
    pub(crate) test: bool,
}

/// Hotel and date selection after `--test` has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunPlan {
    pub(crate) session: Option<u8>,
    pub(crate) limit: Option<usize>,
    pub(crate) dates: Option<usize>,
    pub(crate) j_plus: Option<i64>,
}

impl RunArgs {
    pub(crate) fn plan(&self) -> RunPlan {
        if self.test {
            return RunPlan {
                session: None,
                limit: Some(1),
                dates: Some(3),
                j_plus: None,
            };
        }
        RunPlan {
            session: self.session,
            limit: self.limit,
            dates: self.dates,
            j_plus: self.j_plus,
        }
    }
}

/// What a scheduled or manual run reports back.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunOutcome {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) stats: RunStats,
    pub(crate) snapshot_count: usize,
}

impl RunOutcome {
    fn completed(stats: RunStats, snapshot_count: usize) -> Self {
        Self {
            success: true,
            message: "price run completed".to_owned(),
            stats,
            snapshot_count,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            stats: RunStats::default(),
            snapshot_count: 0,
        }
    }

    pub(crate) fn print_summary(&self) {
        println!("{}", self.message);
        if !self.success {
            return;
        }
        println!(
            "  hotels: {}/{} succeeded, {} failed",
            self.stats.successful_hotels, self.stats.total_hotels, self.stats.failed_hotels
        );
        println!("  snapshots: {}", self.snapshot_count);
        for error in &self.stats.errors {
            println!("  error: {error}");
        }
    }
}

/// Session slot then limit, in registry order. A zero limit means no limit.
pub(crate) fn select_hotels(
    hotels: Vec<HotelTarget>,
    session: Option<u8>,
    limit: Option<usize>,
) -> Vec<HotelTarget> {
    let mut selected: Vec<HotelTarget> = match session {
        Some(slot @ 1..=2) => hotels
            .into_iter()
            .skip(usize::from(slot - 1) * SLOT_SIZE)
            .take(SLOT_SIZE)
            .collect(),
        _ => hotels,
    };
    if let Some(limit) = limit.filter(|&n| n > 0) {
        selected.truncate(limit);
    }
    selected
}

fn orchestrator_config(config: &AppConfig, args: &RunArgs) -> OrchestratorConfig {
    let mut orchestrator = OrchestratorConfig::from_app_config(config)
        .with_strategy(args.strategy.unwrap_or(config.default_strategy));
    if let Some(workers) = args.workers {
        orchestrator.parallel_workers = workers.max(1);
    }
    orchestrator
}

fn build_factory(config: &AppConfig) -> anyhow::Result<WebDriverFactory> {
    WebDriverFactory::new(WebDriverConfig::from_app_config(config))
        .map_err(|e| anyhow::anyhow!("failed to build WebDriver factory: {e}"))
}

/// Runs one collection over the registry.
pub(crate) async fn run(config: &AppConfig, args: &RunArgs) -> RunOutcome {
    match try_run(config, args).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "price run aborted");
            RunOutcome::failed(format!("fatal error: {e:#}"))
        }
    }
}

async fn try_run(config: &AppConfig, args: &RunArgs) -> anyhow::Result<RunOutcome> {
    let plan = args.plan();
    let registry = ratewatch_core::load_hotels(&config.hotels_path)?;
    let hotels = select_hotels(registry.monitored(), plan.session, plan.limit);

    if hotels.is_empty() {
        tracing::warn!(
            path = %config.hotels_path.display(),
            session = ?plan.session,
            "no active hotels to collect"
        );
        return Ok(RunOutcome::failed("no active hotels"));
    }

    let names: Vec<&str> = hotels.iter().map(|h| h.name.as_str()).collect();
    tracing::info!(
        count = hotels.len(),
        session = ?plan.session,
        dates = ?plan.dates,
        j_plus = ?plan.j_plus,
        hotels = %names.join(", "),
        "starting price run"
    );

    let request = PriceRequest {
        hotels,
        max_dates: plan.dates,
        day_offsets: plan.j_plus.map(|n| vec![n]),
    };
    let factory = build_factory(config)?;
    let report = collect_prices(
        &factory,
        &request,
        &orchestrator_config(config, args),
        &TracingObserver,
    )
    .await?;

    if !report.snapshots.is_empty() {
        let destination = args.out.clone().or_else(|| config.snapshot_out.clone());
        let sink = JsonSnapshotSink::new(destination);
        let written = sink.persist(&report.snapshots)?;
        tracing::info!(written, destination = %sink.destination(), "snapshots persisted");
    }

    Ok(RunOutcome::completed(report.stats, report.snapshots.len()))
}

/// Single listing test run. Succeeds when at least one snapshot came back.
pub(crate) async fn run_url(
    config: &AppConfig,
    url: &str,
    dates: Option<usize>,
) -> anyhow::Result<bool> {
    let request = PriceRequest {
        hotels: vec![HotelTarget::new(TEST_URL_HOTEL_ID, "Listing (URL)", url)],
        max_dates: dates,
        day_offsets: None,
    };
    let orchestrator =
        OrchestratorConfig::from_app_config(config).with_strategy(StrategyMode::Isolated);
    let factory = build_factory(config)?;
    let report = collect_prices(&factory, &request, &orchestrator, &TracingObserver).await?;

    for error in &report.stats.errors {
        println!("error: {error}");
    }
    println!("{} snapshots", report.snapshots.len());
    print_preview(&report.snapshots);
    Ok(!report.snapshots.is_empty())
}

/// Builds snapshots from a saved availability payload instead of a live page.
pub(crate) fn run_payload(
    config: &AppConfig,
    file: &Path,
    hotel_id: &str,
    dates: Option<usize>,
    j_plus: Option<i64>,
) -> anyhow::Result<bool> {
    let snapshots = snapshots_from_payload_file(file, hotel_id, dates, j_plus)?;
    let observed = snapshots.iter().filter(|s| s.available).count();
    tracing::info!(
        file = %file.display(),
        hotel_id,
        snapshots = snapshots.len(),
        observed,
        "payload parsed"
    );

    JsonSnapshotSink::new(config.snapshot_out.clone()).persist(&snapshots)?;
    Ok(observed > 0)
}

pub(crate) fn snapshots_from_payload_file(
    file: &Path,
    hotel_id: &str,
    dates: Option<usize>,
    j_plus: Option<i64>,
) -> anyhow::Result<Vec<PriceSnapshot>> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", file.display()))?;
    let body: serde_json::Value = serde_json::from_str(&raw)?;

    let offsets = j_plus.map(|n| vec![n]);
    let window = build_window(today(), dates, offsets.as_deref())?;
    let observations = locate_payload_observations(&body);
    if observations.is_empty() {
        tracing::warn!(file = %file.display(), "no calendar days found in payload");
    }
    Ok(assemble_snapshots(hotel_id, &window, &observations))
}

fn print_preview(snapshots: &[PriceSnapshot]) {
    for snapshot in snapshots.iter().take(PREVIEW_ROWS) {
        let price = snapshot
            .price
            .map_or_else(|| "-".to_owned(), |p| format!("{p:.2} {}", snapshot.currency.code()));
        println!(
            "  {}: {price} (available: {})",
            snapshot.date_checkin, snapshot.available
        );
    }
}
