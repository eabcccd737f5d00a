//! Output artifacts of a price run: per-date snapshots and run statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Currency of every snapshot in a window. Only euros are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
        }
    }
}

/// One (hotel, check-in date) price observation at the time of a run.
///
/// Serialized in the shape the persistence layer expects:
/// `{"hotelId", "dateCheckin", "price", "currency", "available"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub hotel_id: String,
    pub date_checkin: NaiveDate,
    /// Nightly price; `None` when the date is unavailable or no price was read.
    pub price: Option<f64>,
    pub currency: Currency,
    pub available: bool,
}

impl PriceSnapshot {
    /// Snapshot for a date where nothing usable was observed.
    #[must_use]
    pub fn unavailable(hotel_id: &str, date_checkin: NaiveDate) -> Self {
        Self {
            hotel_id: hotel_id.to_owned(),
            date_checkin,
            price: None,
            currency: Currency::Eur,
            available: false,
        }
    }
}

/// A failed hotel and the error that stopped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelError {
    pub hotel_name: String,
    pub message: String,
}

impl std::fmt::Display for HotelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.hotel_name, self.message)
    }
}

/// Aggregated counters for one orchestration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_hotels: usize,
    pub total_snapshots: usize,
    pub successful_hotels: usize,
    pub failed_hotels: usize,
    pub errors: Vec<HotelError>,
}

impl RunStats {
    #[must_use]
    pub fn new(total_hotels: usize) -> Self {
        Self {
            total_hotels,
            ..Self::default()
        }
    }

    /// Records a completed hotel and the number of snapshots it produced.
    pub fn record_success(&mut self, snapshot_count: usize) {
        self.successful_hotels += 1;
        self.total_snapshots += snapshot_count;
    }

    /// Records a failed hotel: one counter increment, one error entry.
    pub fn record_failure(&mut self, hotel_name: &str, message: impl Into<String>) {
        self.failed_hotels += 1;
        self.errors.push(HotelError {
            hotel_name: hotel_name.to_owned(),
            message: message.into(),
        });
    }

    /// Hotels that have either succeeded or failed so far.
    #[must_use]
    pub fn completed_hotels(&self) -> usize {
        self.successful_hotels + self.failed_hotels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn snapshot_serializes_to_wire_shape() {
        let snapshot = PriceSnapshot {
            hotel_id: "h-1".to_owned(),
            date_checkin: date(2026, 2, 11),
            price: Some(152.0),
            currency: Currency::Eur,
            available: true,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "hotelId": "h-1",
                "dateCheckin": "2026-02-11",
                "price": 152.0,
                "currency": "EUR",
                "available": true
            })
        );
    }

    #[test]
    fn unavailable_snapshot_has_null_price() {
        let snapshot = PriceSnapshot::unavailable("h-2", date(2026, 3, 1));
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["price"], serde_json::Value::Null);
        assert_eq!(value["available"], false);
    }

    #[test]
    fn run_stats_counts_successes_and_failures() {
        let mut stats = RunStats::new(3);
        stats.record_success(30);
        stats.record_failure("Hôtel B", "navigation timed out");
        stats.record_success(30);

        assert_eq!(stats.total_hotels, 3);
        assert_eq!(stats.successful_hotels, 2);
        assert_eq!(stats.failed_hotels, 1);
        assert_eq!(stats.total_snapshots, 60);
        assert_eq!(stats.completed_hotels(), 3);
        assert_eq!(stats.errors.len(), 1);
        assert_eq!(stats.errors[0].to_string(), "Hôtel B: navigation timed out");
    }
}
