//! Multi-hotel runs under one of three session strategies.
//!
//! - [`StrategyMode::Isolated`]: a fresh browser per hotel, paced.
//! - [`StrategyMode::SharedSession`]: one browser, one tab per hotel, paced.
//! - [`StrategyMode::BoundedParallel`]: up to `parallel_workers` hotels at
//!   once, each in its own browser, unpaced.
//!
//! A hotel failure never stops the run. The orchestrator is the only writer
//! of [`RunStats`].

use futures::stream::{self, StreamExt};
use ratewatch_core::{AppConfig, HotelTarget, PriceSnapshot, RunStats, StrategyMode};

use crate::dates::{build_window, today, DateWindow};
use crate::error::ScraperError;
use crate::events::{RunEvent, RunObserver};
use crate::pacing::PauseRange;
use crate::procedure::{extract_hotel_prices, HotelExtraction, ProcedureConfig};
use crate::session::{BrowserSession, SessionFactory};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub strategy: StrategyMode,
    /// Concurrency width for [`StrategyMode::BoundedParallel`].
    pub parallel_workers: usize,
    /// Pause between consecutive hotels in the sequential strategies.
    pub hotel_pause: PauseRange,
    pub procedure: ProcedureConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyMode::Isolated,
            parallel_workers: 2,
            hotel_pause: PauseRange::from_secs(5, 12),
            procedure: ProcedureConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            strategy: config.default_strategy,
            parallel_workers: config.parallel_workers,
            hotel_pause: PauseRange::from_millis(
                config.hotel_pause_min_ms,
                config.hotel_pause_max_ms,
            ),
            procedure: ProcedureConfig::default().with_navigation_timeout(
                std::time::Duration::from_secs(config.navigation_timeout_secs),
            ),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyMode) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Aggregated result of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub stats: RunStats,
    /// Snapshots of every hotel that reached a page, grouped per hotel.
    pub snapshots: Vec<PriceSnapshot>,
}

/// What a scheduler asks for: which hotels, and which dates.
#[derive(Debug, Clone, Default)]
pub struct PriceRequest {
    pub hotels: Vec<HotelTarget>,
    /// Cap on the default 30-day window; ignored when offsets are given.
    pub max_dates: Option<usize>,
    pub day_offsets: Option<Vec<i64>>,
}

/// Builds the date window from `request` and runs [`scrape_hotels`].
///
/// # Errors
///
/// [`ScraperError::NoHotels`] for an empty hotel list, or a window error for
/// invalid offsets. Per-hotel failures are reported in the stats instead.
pub async fn collect_prices<F: SessionFactory>(
    factory: &F,
    request: &PriceRequest,
    config: &OrchestratorConfig,
    observer: &dyn RunObserver,
) -> Result<RunReport, ScraperError> {
    if request.hotels.is_empty() {
        return Err(ScraperError::NoHotels);
    }
    let window = build_window(today(), request.max_dates, request.day_offsets.as_deref())?;
    scrape_hotels(factory, &request.hotels, &window, config, observer).await
}

/// Runs the extraction procedure for every hotel under `config.strategy`.
///
/// # Errors
///
/// Only [`ScraperError::NoHotels`]; everything else is per hotel.
pub async fn scrape_hotels<F: SessionFactory>(
    factory: &F,
    hotels: &[HotelTarget],
    window: &DateWindow,
    config: &OrchestratorConfig,
    observer: &dyn RunObserver,
) -> Result<RunReport, ScraperError> {
    if hotels.is_empty() {
        return Err(ScraperError::NoHotels);
    }

    observer.on_event(&RunEvent::RunStarted {
        strategy: config.strategy,
        hotels: hotels.len(),
        dates: window.len(),
    });

    let mut report = RunReport {
        stats: RunStats::new(hotels.len()),
        snapshots: Vec::with_capacity(hotels.len() * window.len()),
    };

    match config.strategy {
        StrategyMode::Isolated => {
            run_isolated(factory, hotels, window, config, observer, &mut report).await;
        }
        StrategyMode::SharedSession => {
            run_shared(factory, hotels, window, config, observer, &mut report).await;
        }
        StrategyMode::BoundedParallel => {
            run_parallel(factory, hotels, window, config, observer, &mut report).await;
        }
    }

    observer.on_event(&RunEvent::RunFinished {
        successful: report.stats.successful_hotels,
        failed: report.stats.failed_hotels,
        snapshots: report.stats.total_snapshots,
    });
    Ok(report)
}

async fn run_isolated<F: SessionFactory>(
    factory: &F,
    hotels: &[HotelTarget],
    window: &DateWindow,
    config: &OrchestratorConfig,
    observer: &dyn RunObserver,
    report: &mut RunReport,
) {
    for (index, hotel) in hotels.iter().enumerate() {
        announce(observer, hotel, index, hotels.len());
        let outcome = in_fresh_session(factory, hotel, window, &config.procedure, observer).await;
        record(report, hotel, outcome, observer);
        if index + 1 < hotels.len() {
            pace(config.hotel_pause, observer).await;
        }
    }
}

async fn run_shared<F: SessionFactory>(
    factory: &F,
    hotels: &[HotelTarget],
    window: &DateWindow,
    config: &OrchestratorConfig,
    observer: &dyn RunObserver,
    report: &mut RunReport,
) {
    let mut session = match factory.acquire().await {
        Ok(session) => session,
        Err(e) => {
            let message = ScraperError::Session(e).to_string();
            for hotel in hotels {
                observer.on_event(&RunEvent::HotelFailed {
                    hotel: &hotel.name,
                    error: message.clone(),
                });
                report.stats.record_failure(&hotel.name, message.clone());
            }
            return;
        }
    };

    for (index, hotel) in hotels.iter().enumerate() {
        announce(observer, hotel, index, hotels.len());
        let outcome = if index == 0 {
            match session.initial_page().await {
                Ok(page) => Ok(
                    extract_hotel_prices(&page, hotel, window, &config.procedure, observer).await,
                ),
                Err(e) => Err(ScraperError::Session(e)),
            }
        } else {
            match session.new_page().await {
                Ok(page) => {
                    let extraction =
                        extract_hotel_prices(&page, hotel, window, &config.procedure, observer)
                            .await;
                    if let Err(e) = session.close_page(page).await {
                        observer.on_event(&RunEvent::SessionReleaseFailed {
                            error: e.to_string(),
                        });
                    }
                    Ok(extraction)
                }
                Err(e) => Err(ScraperError::Session(e)),
            }
        };
        record(report, hotel, outcome, observer);
        if index + 1 < hotels.len() {
            pace(config.hotel_pause, observer).await;
        }
    }

    release(&mut session, observer).await;
}

async fn run_parallel<F: SessionFactory>(
    factory: &F,
    hotels: &[HotelTarget],
    window: &DateWindow,
    config: &OrchestratorConfig,
    observer: &dyn RunObserver,
    report: &mut RunReport,
) {
    let width = config.parallel_workers.max(1);
    let total = hotels.len();

    let jobs: Vec<_> = hotels
        .iter()
        .enumerate()
        .map(move |(index, hotel)| async move {
            announce(observer, hotel, index, total);
            let outcome =
                in_fresh_session(factory, hotel, window, &config.procedure, observer).await;
            (hotel, outcome)
        })
        .collect();
    let mut completions = stream::iter(jobs).buffer_unordered(width);

    while let Some((hotel, outcome)) = completions.next().await {
        record(report, hotel, outcome, observer);
    }
}

/// Acquires a browser, runs the procedure on its initial tab, releases it.
async fn in_fresh_session<F: SessionFactory>(
    factory: &F,
    hotel: &HotelTarget,
    window: &DateWindow,
    procedure: &ProcedureConfig,
    observer: &dyn RunObserver,
) -> Result<HotelExtraction, ScraperError> {
    let mut session = factory.acquire().await?;
    let outcome = match session.initial_page().await {
        Ok(page) => Ok(extract_hotel_prices(&page, hotel, window, procedure, observer).await),
        Err(e) => Err(ScraperError::Session(e)),
    };
    release(&mut session, observer).await;
    outcome
}

async fn release<S: BrowserSession>(session: &mut S, observer: &dyn RunObserver) {
    if let Err(e) = session.close().await {
        observer.on_event(&RunEvent::SessionReleaseFailed {
            error: e.to_string(),
        });
    }
}

async fn pace(range: PauseRange, observer: &dyn RunObserver) {
    let delay = range.sample();
    observer.on_event(&RunEvent::Pausing { delay });
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn announce(observer: &dyn RunObserver, hotel: &HotelTarget, index: usize, total: usize) {
    observer.on_event(&RunEvent::HotelStarted {
        hotel: &hotel.name,
        position: index + 1,
        total,
    });
}

/// Folds one hotel's outcome into the report. A fatal extraction still adds
/// its unavailable window; a session that never opened adds nothing.
fn record(
    report: &mut RunReport,
    hotel: &HotelTarget,
    outcome: Result<HotelExtraction, ScraperError>,
    observer: &dyn RunObserver,
) {
    match outcome {
        Ok(HotelExtraction {
            snapshots,
            observed,
            fatal: None,
            ..
        }) => {
            observer.on_event(&RunEvent::HotelFinished {
                hotel: &hotel.name,
                snapshots: snapshots.len(),
                observed,
            });
            report.stats.record_success(snapshots.len());
            report.snapshots.extend(snapshots);
        }
        Ok(HotelExtraction {
            snapshots,
            fatal: Some(e),
            ..
        }) => {
            fail(report, hotel, &e, observer);
            report.stats.total_snapshots += snapshots.len();
            report.snapshots.extend(snapshots);
        }
        Err(e) => fail(report, hotel, &e, observer),
    }
}

fn fail(
    report: &mut RunReport,
    hotel: &HotelTarget,
    error: &ScraperError,
    observer: &dyn RunObserver,
) {
    let message = error.to_string();
    observer.on_event(&RunEvent::HotelFailed {
        hotel: &hotel.name,
        error: message.clone(),
    });
    report.stats.record_failure(&hotel.name, message);
}
