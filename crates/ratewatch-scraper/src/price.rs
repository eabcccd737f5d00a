//! Locale-formatted currency text to bounded nightly prices.
//!
//! Booking pages render prices as `€ 152`, `152 €`, `€ 1 250,50` or
//! `€1,250.50` depending on locale. Everything here is pure; a rejected price
//! is `None`, never an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::calendar::Observation;

/// Smallest plausible nightly price. Lower values are placeholders or noise.
pub const PRICE_FLOOR: f64 = 10.0;

/// Exclusive upper bound on a plausible nightly price.
pub const PRICE_CEILING: f64 = 10_000.0;

/// A digit run with optional grouping (space + three digits) or separators.
const AMOUNT: &str = r"[0-9]+(?:\s[0-9]{3}\b|[.,][0-9]+)*";

static SYMBOL_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"[€$£]\s*({AMOUNT})")).expect("valid regex"));

static ANY_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("({AMOUNT})")).expect("valid regex"));

/// Parses a displayed price, preferring the amount that follows a currency
/// symbol and falling back to the first number in the text.
///
/// Returns `None` unless the amount lies in `[PRICE_FLOOR, PRICE_CEILING)`.
#[must_use]
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned = clean(text);
    let raw = capture(&SYMBOL_AMOUNT, &cleaned).or_else(|| capture(&ANY_AMOUNT, &cleaned))?;
    bounded(normalize_amount(raw)?)
}

/// Like [`parse_price_text`] but only accepts an amount introduced by a
/// currency symbol. Calendar cells also contain the bare day number, which
/// must never be read as a price.
#[must_use]
pub fn parse_currency_amount(text: &str) -> Option<f64> {
    let cleaned = clean(text);
    let raw = capture(&SYMBOL_AMOUNT, &cleaned)?;
    bounded(normalize_amount(raw)?)
}

/// Pairs a raw price text with an availability claim.
///
/// The claim survives only when a bounded price was found: a zero, tiny or
/// malformed price downgrades the date to unavailable.
#[must_use]
pub fn normalize_observation(text: Option<&str>, claimed_available: bool) -> Observation {
    match text.and_then(parse_price_text) {
        Some(price) => Observation {
            price: Some(price),
            available: claimed_available,
        },
        None => Observation::unavailable(),
    }
}

fn clean(text: &str) -> String {
    text.replace(['\u{a0}', '\u{202f}'], " ")
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn bounded(amount: f64) -> Option<f64> {
    (PRICE_FLOOR..PRICE_CEILING).contains(&amount).then_some(amount)
}

/// Resolves grouping and decimal separators, then parses.
///
/// - both `.` and `,` present: the right-most one is the decimal mark;
/// - a single separator followed by one or two digits is a decimal mark;
/// - any other separator is grouping.
fn normalize_amount(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let last_dot = compact.rfind('.');
    let last_comma = compact.rfind(',');

    let decimal_at = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => Some(dot.max(comma)),
        (Some(pos), None) | (None, Some(pos)) => {
            let sep = compact.as_bytes()[pos];
            let single = compact.bytes().filter(|&b| b == sep).count() == 1;
            let trailing = compact.len() - pos - 1;
            (single && (1..=2).contains(&trailing)).then_some(pos)
        }
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(compact.len());
    for (i, c) in compact.char_indices() {
        match c {
            '.' | ',' if Some(i) == decimal_at => normalized.push('.'),
            '.' | ',' => {}
            _ => normalized.push(c),
        }
    }
    normalized.parse::<f64>().ok()
}
