//! Calendar extraction from the rendered date-picker grid.
//!
//! A single in-page script snapshots the raw attributes of every candidate
//! cell for each selector family; classification happens here, in Rust, so it
//! can be tested without a browser.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::ranked::{first_success, Step};
use super::{CalendarObservations, Observation};
use crate::price::parse_currency_amount;
use crate::session::{PageSession, SessionError};

/// Cell selector families, most specific first.
pub const CELL_FAMILIES: [&str; 3] = [
    "main table tbody tr td",
    "[data-date]",
    "table tbody tr td",
];

/// Fewer cells than this means the family did not hit the calendar.
pub const MIN_FAMILY_CELLS: usize = 5;

static DISABLED_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)disabled|unavailable|blocked|grayed").expect("valid regex")
});

/// Collects raw cell data for every family in `arguments[0]`.
pub const CAPTURE_SCRIPT: &str = r"
const families = arguments[0];
const out = {};
for (const selector of families) {
  out[selector] = Array.from(document.querySelectorAll(selector)).map((cell) => {
    const dated = cell.getAttribute('data-date')
      || cell.querySelector('[data-date]')?.getAttribute('data-date')
      || cell.closest('[data-date]')?.getAttribute('data-date')
      || null;
    const priceNode = cell.querySelector('span div span')
      || cell.querySelector('span span')
      || cell.querySelector('span');
    return {
      date: dated,
      priceText: priceNode ? priceNode.textContent : null,
      text: cell.textContent,
      disabled: cell.hasAttribute('disabled'),
      ariaDisabled: cell.getAttribute('aria-disabled'),
      className: cell.getAttribute('class'),
    };
  });
}
return out;
";

/// Raw attributes of one calendar cell, as captured in the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCell {
    pub date: Option<String>,
    pub price_text: Option<String>,
    pub text: Option<String>,
    pub disabled: bool,
    pub aria_disabled: Option<String>,
    pub class_name: Option<String>,
}

impl RawCell {
    fn is_disabled(&self) -> bool {
        self.disabled
            || self.aria_disabled.as_deref() == Some("true")
            || self
                .class_name
                .as_deref()
                .is_some_and(|c| DISABLED_CLASS.is_match(c))
    }

    fn price(&self) -> Option<f64> {
        self.price_text
            .as_deref()
            .and_then(parse_currency_amount)
            .or_else(|| self.text.as_deref().and_then(parse_currency_amount))
    }

    /// `None` for cells without a usable date.
    fn observation(&self) -> Option<(NaiveDate, Observation)> {
        let date = derive_checkin(self.date.as_deref()?)?;
        let observation = match self.price() {
            Some(price) if !self.is_disabled() => Observation {
                price: Some(price),
                available: true,
            },
            _ => Observation::unavailable(),
        };
        Some((date, observation))
    }
}

/// Cells captured per selector family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct GridCapture {
    families: HashMap<String, Vec<RawCell>>,
}

impl GridCapture {
    #[must_use]
    pub fn from_families(families: HashMap<String, Vec<RawCell>>) -> Self {
        Self { families }
    }

    #[must_use]
    pub fn cells(&self, family: &str) -> &[RawCell] {
        self.families.get(family).map(Vec::as_slice).unwrap_or_default()
    }

    fn dense(&self, family: &'static str) -> Option<&'static str> {
        (self.cells(family).len() >= MIN_FAMILY_CELLS).then_some(family)
    }
}

fn main_table(capture: &GridCapture) -> Option<&'static str> {
    capture.dense(CELL_FAMILIES[0])
}

fn dated_cells(capture: &GridCapture) -> Option<&'static str> {
    capture.dense(CELL_FAMILIES[1])
}

fn any_table(capture: &GridCapture) -> Option<&'static str> {
    capture.dense(CELL_FAMILIES[2])
}

const FAMILY_STEPS: [Step<GridCapture, &'static str>; 3] = [
    Step {
        name: "main_table",
        run: main_table,
    },
    Step {
        name: "dated_cells",
        run: dated_cells,
    },
    Step {
        name: "any_table",
        run: any_table,
    },
];

/// The family to read: the first with enough cells, else the broadest one.
#[must_use]
pub fn select_family(capture: &GridCapture) -> &'static str {
    match first_success(capture, &FAMILY_STEPS) {
        Some((step, family)) => {
            tracing::trace!(step, family, "calendar cell family selected");
            family
        }
        None => CELL_FAMILIES[CELL_FAMILIES.len() - 1],
    }
}

/// Classifies the cells of the selected family into observations.
#[must_use]
pub fn extract_from_grid(capture: &GridCapture) -> CalendarObservations {
    let mut observations = CalendarObservations::new();
    for cell in capture.cells(select_family(capture)) {
        if let Some((date, observation)) = cell.observation() {
            observations.record(date, observation);
        }
    }
    observations
}

/// Captures the rendered calendar on `page` and classifies it.
///
/// # Errors
///
/// Propagates script evaluation failures, and returns
/// [`SessionError::Protocol`] when the capture has an unexpected shape.
pub async fn locate_grid_observations<P: PageSession + ?Sized>(
    page: &P,
) -> Result<CalendarObservations, SessionError> {
    let families = CELL_FAMILIES.iter().map(|f| Value::from(*f)).collect();
    let raw = page
        .evaluate(CAPTURE_SCRIPT, vec![Value::Array(families)])
        .await?;
    let capture: GridCapture = serde_json::from_value(raw)
        .map_err(|e| SessionError::Protocol(format!("calendar capture: {e}")))?;
    Ok(extract_from_grid(&capture))
}

/// ISO date from a `data-date` value: `YYYY-MM-DD…` as-is, otherwise the first
/// eight digits of the digit-only form read as `YYYYMMDD`.
fn derive_checkin(raw: &str) -> Option<NaiveDate> {
    if let Some(iso) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
            return Some(date);
        }
    }
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let year = digits.get(..4)?.parse().ok()?;
    let month = digits.get(4..6)?.parse().ok()?;
    let day = digits.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
