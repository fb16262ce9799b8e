//! Shared date/time helpers.
//!
//! All lifecycle decisions (attendance day, cutoff comparison, leave windows)
//! use local wall-clock time. Persisted dates are `YYYY-MM-DD` and timestamps
//! are ISO-8601, which matches SQLite's `CURRENT_DATE`/`CURRENT_TIMESTAMP`.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::core::error::RollcallError;

static MONTH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap());

/// The attendance day as observed on this machine's clock.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parses a `YYYY-MM-DD` date argument. Rejects anything chrono would not
/// round-trip (e.g. `2026-02-30`).
pub fn parse_date(raw: &str) -> Result<NaiveDate, RollcallError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        RollcallError::Validation(format!("invalid date '{raw}', expected YYYY-MM-DD"))
    })
}

/// Validates a `YYYY-MM` month filter and returns it unchanged. Month filters
/// are compared against `strftime('%Y-%m', ...)` in SQL, so the canonical
/// zero-padded form is required.
pub fn parse_month(raw: &str) -> Result<String, RollcallError> {
    if MONTH_PATTERN.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Err(RollcallError::Validation(format!(
            "invalid month '{raw}', expected YYYY-MM"
        )))
    }
}
