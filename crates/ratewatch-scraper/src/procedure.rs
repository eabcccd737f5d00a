//! Single-hotel extraction: load the listing, reveal the date picker, read
//! the calendar, and produce one snapshot per window date.
//!
//! The procedure never fails as a whole. Fatal problems (the listing does not
//! load, the date control never shows up) are reported in
//! [`HotelExtraction::fatal`]; everything else degrades and extraction
//! carries on. The snapshot list always covers the full window.

use std::time::Duration;

use ratewatch_core::{HotelTarget, PriceSnapshot};
use serde_json::Value;

use crate::calendar::{locate_grid_observations, CalendarObservations, Observation};
use crate::dates::DateWindow;
use crate::error::ScraperError;
use crate::events::{ProcedureStep, RunEvent, RunObserver};
use crate::pacing::{LinearBackoff, PauseRange};
use crate::session::{
    locate, wait_for, ElementState, Locator, PageSession, Readiness, SessionError, Selector,
};

/// Cookie/consent controls, tried in order; the first visible one is clicked.
pub const CONSENT_SELECTORS: [&str; 7] = [
    "//button[contains(normalize-space(.), 'Accepter')]",
    "//button[contains(normalize-space(.), 'Accept')]",
    "//button[contains(normalize-space(.), 'OK')]",
    "[data-testid='accept-cookies']",
    "button[id*='accept']",
    "//a[contains(normalize-space(.), 'Accepter')]",
    "//a[contains(normalize-space(.), 'Accept')]",
];

pub const DATE_CONTROL_SELECTOR: &str = "[data-testid='date-display-field-start']";
pub const DATE_CONTROL_FALLBACK: &str = "//button[contains(., \"Date d'arrivée\")]";
pub const CALENDAR_INDICATOR_SELECTOR: &str =
    "[data-date], [data-testid*='calendar'], .bui-calendar__day";

const SCROLL_SCRIPT: &str = "window.scrollBy(0, arguments[0]);";
const CLICK_BUTTON_SCRIPT: &str =
    "const el = arguments[0]; const target = el.closest('button') || el; target.click();";

/// Timing and retry knobs for one hotel.
#[derive(Debug, Clone)]
pub struct ProcedureConfig {
    pub navigation_timeout: Duration,
    pub settle_after_navigation: PauseRange,
    pub settle_after_consent: PauseRange,
    pub settle_after_scroll: PauseRange,
    pub scroll_by_px: u32,
    pub control_timeout: Duration,
    pub calendar_timeout: Duration,
    pub poll_interval: Duration,
    pub capture_attempts: u32,
    pub capture_backoff: LinearBackoff,
    /// Captures stop once this many dates (capped at the window size) are seen.
    pub min_observed: usize,
}

impl Default for ProcedureConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(25),
            settle_after_navigation: PauseRange::from_secs(2, 4),
            settle_after_consent: PauseRange::from_secs(1, 2),
            settle_after_scroll: PauseRange::from_secs(0, 1),
            scroll_by_px: 800,
            control_timeout: Duration::from_secs(10),
            calendar_timeout: Duration::from_secs(8),
            poll_interval: Duration::from_millis(250),
            capture_attempts: 3,
            capture_backoff: LinearBackoff::new(
                Duration::from_millis(1_500),
                Duration::from_secs(1),
            ),
            min_observed: 3,
        }
    }
}

impl ProcedureConfig {
    /// No pauses and short waits, for scripted pages.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(1),
            settle_after_navigation: PauseRange::none(),
            settle_after_consent: PauseRange::none(),
            settle_after_scroll: PauseRange::none(),
            control_timeout: Duration::from_millis(20),
            calendar_timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(1),
            capture_backoff: LinearBackoff::none(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// Outcome of the procedure for one hotel.
#[derive(Debug)]
pub struct HotelExtraction {
    pub hotel_id: String,
    /// One per window date, ascending.
    pub snapshots: Vec<PriceSnapshot>,
    /// Window dates with any observation.
    pub observed: usize,
    pub fatal: Option<ScraperError>,
    pub degradations: Vec<String>,
}

impl HotelExtraction {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.fatal.is_none()
    }
}

/// Listing URL with `checkin`/`checkout` query parameters covering `window`.
///
/// Any fragment on `base` is dropped.
#[must_use]
pub fn build_listing_url(base: &str, window: &DateWindow) -> String {
    let base = base.split('#').next().unwrap_or(base);
    let (Some(checkin), Some(checkout)) = (window.first(), window.checkout()) else {
        return base.to_owned();
    };
    let separator = if base.ends_with('?') || base.ends_with('&') {
        ""
    } else if base.contains('?') {
        "&"
    } else {
        "?"
    };
    format!(
        "{base}{separator}checkin={}&checkout={}",
        checkin.format("%Y-%m-%d"),
        checkout.format("%Y-%m-%d")
    )
}

/// One snapshot per window date; dates without an available, priced
/// observation are unavailable.
#[must_use]
pub fn assemble_snapshots(
    hotel_id: &str,
    window: &DateWindow,
    observations: &CalendarObservations,
) -> Vec<PriceSnapshot> {
    window
        .iter()
        .map(|date| match observations.get(date) {
            Some(&Observation {
                price: Some(price),
                available: true,
            }) => PriceSnapshot {
                price: Some(price),
                available: true,
                ..PriceSnapshot::unavailable(hotel_id, date)
            },
            _ => PriceSnapshot::unavailable(hotel_id, date),
        })
        .collect()
}

/// Runs the extraction procedure for `hotel` on an already open `page`.
///
/// Neither opens nor closes the page.
pub async fn extract_hotel_prices<P: PageSession + ?Sized>(
    page: &P,
    hotel: &HotelTarget,
    window: &DateWindow,
    config: &ProcedureConfig,
    observer: &dyn RunObserver,
) -> HotelExtraction {
    let mut run = Run {
        page,
        hotel,
        config,
        observer,
        observations: CalendarObservations::new(),
        degradations: Vec::new(),
    };

    let fatal = run.reveal_and_read(window).await.err();
    if let Some(error) = &fatal {
        tracing::debug!(hotel = %hotel.name, error = %error, "extraction stopped early");
    }

    let snapshots = assemble_snapshots(&hotel.id, window, &run.observations);
    run.completed(ProcedureStep::Assemble);

    HotelExtraction {
        hotel_id: hotel.id.clone(),
        observed: run.observations.count_observed(window.dates()),
        snapshots,
        fatal,
        degradations: run.degradations,
    }
}

struct Run<'a, P: ?Sized> {
    page: &'a P,
    hotel: &'a HotelTarget,
    config: &'a ProcedureConfig,
    observer: &'a dyn RunObserver,
    observations: CalendarObservations,
    degradations: Vec<String>,
}

impl<P: PageSession + ?Sized> Run<'_, P> {
    async fn reveal_and_read(&mut self, window: &DateWindow) -> Result<(), ScraperError> {
        self.navigate(window).await?;
        self.accept_consent().await;
        self.reveal_calendar().await?;
        self.read_calendar(window).await;
        Ok(())
    }

    async fn navigate(&mut self, window: &DateWindow) -> Result<(), ScraperError> {
        let url = build_listing_url(&self.hotel.url, window);
        self.page
            .navigate(&url, Readiness::DomContentLoaded, self.config.navigation_timeout)
            .await
            .map_err(|source| ScraperError::Navigation {
                url: url.clone(),
                source,
            })?;
        self.config.settle_after_navigation.pause().await;
        self.completed(ProcedureStep::Navigate);
        Ok(())
    }

    /// Best effort: a missing banner is the normal case.
    async fn accept_consent(&mut self) {
        for raw in CONSENT_SELECTORS {
            let locator = Locator::new(selector_for(raw));
            let Ok(Some(button)) = locate(self.page, &locator).await else {
                continue;
            };
            if !matches!(self.page.is_visible(&button).await, Ok(true)) {
                continue;
            }
            match self.page.click(&button).await {
                Ok(()) => {
                    tracing::debug!(hotel = %self.hotel.name, selector = raw, "consent accepted");
                    break;
                }
                Err(e) => {
                    tracing::debug!(selector = raw, error = %e, "consent click failed");
                }
            }
        }
        self.config.settle_after_consent.pause().await;
        self.completed(ProcedureStep::Consent);
    }

    async fn reveal_calendar(&mut self) -> Result<(), ScraperError> {
        let step = ProcedureStep::RevealCalendar;

        if let Err(e) = self
            .page
            .evaluate(SCROLL_SCRIPT, vec![Value::from(self.config.scroll_by_px)])
            .await
        {
            self.degrade(step, format!("scroll failed: {e}"));
        }
        self.config.settle_after_scroll.pause().await;

        let control = Locator::new(Selector::css(DATE_CONTROL_SELECTOR))
            .or(Selector::xpath(DATE_CONTROL_FALLBACK))
            .last();
        let button = wait_for(
            self.page,
            &control,
            ElementState::Visible,
            self.config.control_timeout,
            self.config.poll_interval,
        )
        .await
        .map_err(|source| match source {
            SessionError::Closed => ScraperError::Session(source),
            source => ScraperError::ControlNotVisible { source },
        })?;

        if let Err(e) = self.page.scroll_into_view(&button).await {
            self.degrade(step, format!("scroll into view failed: {e}"));
        }
        self.config.settle_after_scroll.pause().await;

        if let Err(e) = self.page.evaluate_on(&button, CLICK_BUTTON_SCRIPT).await {
            self.degrade(step, format!("date control click failed: {e}"));
        }
        self.completed(step);
        Ok(())
    }

    async fn read_calendar(&mut self, window: &DateWindow) {
        let step = ProcedureStep::Extract;

        let indicator = Locator::new(Selector::css(CALENDAR_INDICATOR_SELECTOR));
        if let Err(e) = wait_for(
            self.page,
            &indicator,
            ElementState::Visible,
            self.config.calendar_timeout,
            self.config.poll_interval,
        )
        .await
        {
            self.degrade(step, format!("calendar not visible yet: {e}"));
        }

        let target = self.config.min_observed.min(window.len());
        for attempt in 0..self.config.capture_attempts {
            let delay = self.config.capture_backoff.delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match locate_grid_observations(self.page).await {
                Ok(captured) => self.observations.merge(captured),
                Err(e) => {
                    self.degrade(step, format!("capture {} failed: {e}", attempt + 1));
                    continue;
                }
            }

            self.observer.on_event(&RunEvent::ExtractionAttempt {
                hotel: &self.hotel.name,
                attempt: attempt + 1,
                observed: self.observations.len(),
            });
            if self.observations.len() >= target {
                break;
            }
        }
        self.completed(step);
    }

    fn completed(&self, step: ProcedureStep) {
        self.observer.on_event(&RunEvent::StepCompleted {
            hotel: &self.hotel.name,
            step,
        });
    }

    fn degrade(&mut self, step: ProcedureStep, message: String) {
        self.observer.on_event(&RunEvent::Degraded {
            hotel: &self.hotel.name,
            step,
            message: message.clone(),
        });
        self.degradations.push(message);
    }
}

fn selector_for(raw: &str) -> Selector {
    if raw.starts_with("//") {
        Selector::xpath(raw)
    } else {
        Selector::css(raw)
    }
}
