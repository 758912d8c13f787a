//! `YYYY-MM-DD` date validation.

use crate::error::{Result, ToolError};
use chrono::NaiveDate;
use ga4_data_api::DateRange;
use regex::Regex;
use std::sync::LazyLock;

const DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date pattern"));

/// `s` is a real calendar date written exactly as `YYYY-MM-DD`.
#[must_use]
pub fn is_valid_date_format(s: &str) -> bool {
    parse_date(s).is_some()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if !DATE_PATTERN.is_match(s) {
        return None;
    }
    let date = NaiveDate::parse_from_str(s, DATE_FORMAT).ok()?;
    // chrono is lenient about field widths; require an exact round-trip.
    (date.format(DATE_FORMAT).to_string() == s).then_some(date)
}

/// Check both dates and their order. Equal dates are a valid one-day range.
///
/// # Errors
///
/// Returns [`ToolError::InvalidParams`] naming the malformed field, or if `start` is after `end`.
pub fn validate_date_range(start: &str, end: &str) -> Result<DateRange> {
    let start_date = parse_date(start).ok_or_else(|| {
        ToolError::InvalidParams(format!(
            "Invalid startDate format. Expected YYYY-MM-DD, got: {start}"
        ))
    })?;
    let end_date = parse_date(end).ok_or_else(|| {
        ToolError::InvalidParams(format!(
            "Invalid endDate format. Expected YYYY-MM-DD, got: {end}"
        ))
    })?;

    if start_date > end_date {
        return Err(ToolError::InvalidParams(
            "startDate cannot be after endDate".to_string(),
        ));
    }

    Ok(DateRange::new(start, end))
}
