use thiserror::Error;

use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("no hotels provided")]
    NoHotels,

    #[error("date window is empty")]
    EmptyWindow,

    #[error("invalid day offset {offset}: check-in dates start tomorrow (offset >= 1)")]
    InvalidOffset { offset: i64 },

    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: SessionError,
    },

    #[error("date selection control never became visible: {source}")]
    ControlNotVisible {
        #[source]
        source: SessionError,
    },

    #[error("browser session error: {0}")]
    Session(#[from] SessionError),
}

impl ScraperError {
    /// Errors that stop a single hotel but never the run.
    #[must_use]
    pub fn is_fatal_to_hotel(&self) -> bool {
        matches!(
            self,
            ScraperError::Navigation { .. }
                | ScraperError::ControlNotVisible { .. }
                | ScraperError::Session(_)
        )
    }
}
