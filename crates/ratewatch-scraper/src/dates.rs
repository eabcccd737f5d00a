//! Target check-in dates for a run.
//!
//! A [`DateWindow`] is strictly ascending, distinct and non-empty, and never
//! contains "today": check-in dates start tomorrow. It is the canonical
//! iteration order for snapshot assembly.

use chrono::{Days, Local, NaiveDate};

use crate::error::ScraperError;

/// Default rolling horizon: `today+1 ..= today+30`.
pub const DEFAULT_HORIZON_DAYS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    dates: Vec<NaiveDate>,
}

impl DateWindow {
    /// Dates `today+1 ..= today+30`, truncated to `max_dates` when positive.
    #[must_use]
    pub fn next_days(today: NaiveDate, max_dates: Option<usize>) -> Self {
        let mut dates: Vec<NaiveDate> = (1..=DEFAULT_HORIZON_DAYS)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .collect();
        if let Some(cap) = max_dates.filter(|&cap| cap > 0) {
            dates.truncate(cap);
        }
        Self { dates }
    }

    /// One date per offset (`today+offset`), ascending.
    ///
    /// Duplicate offsets collapse to a single date.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::EmptyWindow`] when `offsets` is empty.
    /// - [`ScraperError::InvalidOffset`] for any offset below 1.
    pub fn from_offsets(today: NaiveDate, offsets: &[i64]) -> Result<Self, ScraperError> {
        if offsets.is_empty() {
            return Err(ScraperError::EmptyWindow);
        }
        let mut dates = Vec::with_capacity(offsets.len());
        for &offset in offsets {
            let days = u64::try_from(offset)
                .ok()
                .filter(|&d| d >= 1)
                .ok_or(ScraperError::InvalidOffset { offset })?;
            let date = today
                .checked_add_days(Days::new(days))
                .ok_or(ScraperError::InvalidOffset { offset })?;
            dates.push(date);
        }
        dates.sort_unstable();
        dates.dedup();
        Ok(Self { dates })
    }

    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Always `false` for windows built by this module; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Checkout date for a stay covering the whole window (`last + 1 day`).
    #[must_use]
    pub fn checkout(&self) -> Option<NaiveDate> {
        self.last()
            .and_then(|last| last.checked_add_days(Days::new(1)))
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }
}

/// Local calendar date, the reference point for every window.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// [`DateWindow::next_days`] relative to the local date.
#[must_use]
pub fn default_window(max_dates: Option<usize>) -> DateWindow {
    DateWindow::next_days(today(), max_dates)
}

/// [`DateWindow::from_offsets`] relative to the local date.
///
/// # Errors
///
/// See [`DateWindow::from_offsets`].
pub fn window_from_offsets(offsets: &[i64]) -> Result<DateWindow, ScraperError> {
    DateWindow::from_offsets(today(), offsets)
}

/// Builds the run window: explicit offsets win over the day-count cap.
///
/// # Errors
///
/// See [`DateWindow::from_offsets`].
pub fn build_window(
    today: NaiveDate,
    max_dates: Option<usize>,
    day_offsets: Option<&[i64]>,
) -> Result<DateWindow, ScraperError> {
    match day_offsets {
        Some(offsets) => DateWindow::from_offsets(today, offsets),
        None => Ok(DateWindow::next_days(today, max_dates)),
    }
}
