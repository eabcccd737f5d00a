//! Price snapshot extraction and multi-hotel orchestration.
//!
//! Given a set of hotel listings and a window of check-in dates, drives a
//! browser session per hotel (or a shared one), reads the availability
//! calendar, and returns one [`ratewatch_core::PriceSnapshot`] per hotel and
//! date together with run statistics.

pub mod calendar;
pub mod dates;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod pacing;
pub mod price;
pub mod procedure;
pub mod session;

pub use calendar::{CalendarObservations, Observation};
pub use dates::{build_window, default_window, window_from_offsets, DateWindow};
pub use error::ScraperError;
pub use events::{NoopObserver, RunEvent, RunObserver, TracingObserver};
pub use orchestrator::{
    collect_prices, scrape_hotels, OrchestratorConfig, PriceRequest, RunReport,
};
pub use price::{normalize_observation, parse_currency_amount, parse_price_text};
pub use procedure::{extract_hotel_prices, HotelExtraction, ProcedureConfig};
pub use session::{
    BrowserSession, PageSession, SessionError, SessionFactory, WebDriverConfig, WebDriverFactory,
};
