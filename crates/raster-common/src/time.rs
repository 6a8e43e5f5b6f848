//! Calendar date handling for daily raster products.

use chrono::{Duration, NaiveDate};

/// Date format used in query parameters and raster paths.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, TimeParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))
}

/// Expand an inclusive date range into one entry per calendar day.
///
/// The result is ordered from `start` to `end`. A range whose end precedes
/// its start is empty.
pub fn expand_date_range(start: &str, end: &str) -> Result<Vec<NaiveDate>, TimeParseError> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;

    let days = (end - start).num_days();
    if days < 0 {
        return Ok(Vec::new());
    }

    Ok((0..=days).map(|i| start + Duration::days(i)).collect())
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid date format: {0}. Expected YYYY-MM-DD")]
    InvalidFormat(String),
}
