//! Date -> price/availability extraction from a booking page.
//!
//! Two independent locators feed the same [`CalendarObservations`] map:
//! [`payload`] walks a structured JSON body, [`grid`] classifies rendered
//! calendar cells. Neither is chained to the other for a single call.

pub mod grid;
pub mod payload;
pub mod ranked;

use std::collections::BTreeMap;

use chrono::NaiveDate;

pub use grid::{extract_from_grid, locate_grid_observations, GridCapture, RawCell};
pub use payload::{find_days_array, locate_payload_observations};

/// What the page showed for one check-in date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub price: Option<f64>,
    pub available: bool,
}

impl Observation {
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            price: None,
            available: false,
        }
    }
}

/// Observations keyed by date, iterated in ascending date order.
///
/// A date that has been seen available keeps its observation: later
/// unavailable readings of the same date are ignored, later available ones
/// replace it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarObservations {
    entries: BTreeMap<NaiveDate, Observation>,
}

impl CalendarObservations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, date: NaiveDate, observation: Observation) {
        match self.entries.get(&date) {
            Some(existing) if existing.available && !observation.available => {}
            _ => {
                self.entries.insert(date, observation);
            }
        }
    }

    /// Folds `other` into `self` date by date with the [`record`](Self::record) rule.
    pub fn merge(&mut self, other: CalendarObservations) {
        for (date, observation) in other.entries {
            self.record(date, observation);
        }
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&Observation> {
        self.entries.get(&date)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many of `dates` have any observation at all.
    #[must_use]
    pub fn count_observed(&self, dates: &[NaiveDate]) -> usize {
        dates.iter().filter(|d| self.entries.contains_key(d)).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &Observation)> + '_ {
        self.entries.iter().map(|(d, o)| (*d, o))
    }
}
