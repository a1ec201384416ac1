//! Calendar helpers

use chrono::{Days, NaiveDate};

use crate::error::{ModelError, Result};

/// Parse an ISO `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|source| ModelError::DateParse {
        value: value.to_string(),
        source,
    })
}

/// Every calendar day from `start` to `end`, both inclusive.
/// Empty when `end < start`.
pub fn day_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Inclusive day count, zero when `end < start`
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days() + 1;
    days.max(0) as u32
}

pub fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

pub fn sub_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_range_inclusive() {
        let start = parse_date("2025-01-30").unwrap();
        let end = parse_date("2025-02-02").unwrap();
        let days: Vec<_> = day_range(start, end).collect();

        assert_eq!(days.len(), 4);
        assert_eq!(days[0], start);
        assert_eq!(days[3], end);
        assert_eq!(days_inclusive(start, end), 4);
    }

    #[test]
    fn test_reversed_range_is_empty() {
        let start = parse_date("2025-02-02").unwrap();
        let end = parse_date("2025-01-30").unwrap();

        assert_eq!(day_range(start, end).count(), 0);
        assert_eq!(days_inclusive(start, end), 0);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(parse_date("2025-13-01"), Err(ModelError::DateParse { .. })));
    }
}
