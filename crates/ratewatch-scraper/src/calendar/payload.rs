//! Calendar extraction from a structured JSON response body.
//!
//! The availability calendar can sit at any depth (`data.availabilityCalendar`,
//! `property.availabilityCalendar`, ...). Any object whose `days` field is a
//! non-empty array of `{checkin, avgPriceFormatted, available}` objects counts.

use std::collections::VecDeque;

use chrono::NaiveDate;
use serde_json::Value;

use super::{CalendarObservations, Observation};
use crate::price::normalize_observation;

/// Nesting levels below which the walk stops descending.
pub const MAX_DEPTH: usize = 64;

/// Finds the calendar `days` array in `body`.
///
/// The walk is level by level: the shallowest match wins, and among equally
/// deep matches the first one with object keys visited in sorted order and
/// array items by index.
#[must_use]
pub fn find_days_array(body: &Value) -> Option<&[Value]> {
    let mut queue: VecDeque<(&Value, usize)> = VecDeque::from([(body, 0)]);

    while let Some((node, depth)) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                if let Some(Value::Array(days)) = map.get("days") {
                    if is_calendar_days(days) {
                        return Some(days);
                    }
                }
                if depth < MAX_DEPTH {
                    let mut keys: Vec<&String> = map.keys().collect();
                    keys.sort_unstable();
                    queue.extend(
                        keys.into_iter()
                            .filter_map(|k| map.get(k))
                            .map(|v| (v, depth + 1)),
                    );
                }
            }
            Value::Array(items) if depth < MAX_DEPTH => {
                queue.extend(items.iter().map(|v| (v, depth + 1)));
            }
            _ => {}
        }
    }

    None
}

fn is_calendar_days(days: &[Value]) -> bool {
    !days.is_empty()
        && days.iter().all(|day| {
            day.as_object()
                .is_some_and(|o| o.contains_key("checkin") && o.contains_key("avgPriceFormatted"))
        })
}

/// Converts calendar day entries into observations.
///
/// A day is available only when `available` is literally `true` and its
/// formatted price is within bounds. Entries with a missing or unparseable
/// `checkin` are skipped.
#[must_use]
pub fn observations_from_days(days: &[Value]) -> CalendarObservations {
    let mut observations = CalendarObservations::new();

    for day in days {
        let Some(date) = day.get("checkin").and_then(Value::as_str).and_then(parse_checkin) else {
            continue;
        };
        let claimed = day.get("available") == Some(&Value::Bool(true));
        let formatted = day.get("avgPriceFormatted").and_then(Value::as_str);
        let observation = if claimed {
            normalize_observation(formatted, true)
        } else {
            Observation::unavailable()
        };
        observations.record(date, observation);
    }

    observations
}

/// Full payload path: locate the calendar and convert it. Empty when the body
/// carries no calendar.
#[must_use]
pub fn locate_payload_observations(body: &Value) -> CalendarObservations {
    match find_days_array(body) {
        Some(days) => {
            tracing::debug!(days = days.len(), "found calendar days in payload");
            observations_from_days(days)
        }
        None => {
            tracing::debug!("no calendar days in payload");
            CalendarObservations::new()
        }
    }
}

fn parse_checkin(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}
