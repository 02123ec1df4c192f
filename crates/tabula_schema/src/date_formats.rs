//! Date and time text formats accepted by the DateTime data type.
//!
//! Formats are tried in order; the first one that parses wins. ISO forms come
//! first, then day-first (European) forms, then month-first (US) forms, so an
//! ambiguous "05/06/2024" reads as 5 June.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Date-and-time patterns (strftime syntax).
pub const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only patterns.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%m-%d-%Y",
];

/// Time-only patterns.
pub const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

/// Date carried by time-only values.
pub fn base_date() -> NaiveDate {
    NaiveDate::default()
}

/// Every pattern spells the year with `%Y`, which chrono also accepts with
/// fewer digits. The date part must be three numeric components: a 4-digit
/// year and a 1- or 2-digit day and month.
fn has_full_year(value: &str) -> bool {
    let date_part = value.split(&[' ', 'T'][..]).next().unwrap_or(value);
    let components: Vec<&str> = date_part
        .split(|c: char| !c.is_ascii_digit())
        .filter(|c| !c.is_empty())
        .collect();
    components.len() == 3
        && components.iter().filter(|c| c.len() == 4).count() == 1
        && components.iter().all(|c| c.len() == 4 || c.len() <= 2)
}

/// Parse a full date-time.
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if !has_full_year(value) {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(value, pattern).ok())
}

/// Parse a date-only value; the result sits at midnight.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if !has_full_year(value) {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(value, pattern).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Parse a time-only value; the result sits on [`base_date`].
pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|pattern| NaiveTime::parse_from_str(value, pattern).ok())
        .map(|time| base_date().and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_iso_forms() {
        let dt = parse_date_time("2024-05-31 13:45:10").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 5, 31));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (13, 45, 10));

        assert!(parse_date_time("2024-05-31T13:45:10").is_some());
        assert!(parse_date_time("2024-05-31T13:45:10+02:00").is_some());
    }

    #[test]
    fn test_day_first_wins_when_ambiguous() {
        let dt = parse_date("05/06/2024").unwrap();
        assert_eq!((dt.day(), dt.month()), (5, 6));

        // 31 cannot be a month, so only the month-first reading remains
        let dt = parse_date("05/31/2024").unwrap();
        assert_eq!((dt.day(), dt.month()), (31, 5));
    }

    #[test]
    fn test_time_only_sits_on_base_date() {
        let dt = parse_time("08:15").unwrap();
        assert_eq!(dt.date(), base_date());
        assert_eq!((dt.hour(), dt.minute()), (8, 15));
    }

    #[test]
    fn test_short_years_are_not_dates() {
        assert!(parse_date("1.2.3").is_none());
        assert!(parse_date("4.5.6").is_none());
        assert!(parse_date("1/2/345").is_none());
        assert!(parse_date("12-11-10").is_none());
        assert!(parse_date_time("1.2.3 10:00").is_none());
        assert!(parse_date("1.2.2024").is_some());
        assert!(parse_date_time("1.2.2024 10:00").is_some());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_date("bad-date").is_none());
        assert!(parse_date_time("bad-date").is_none());
        assert!(parse_time("25:99").is_none());
        assert!(parse_date("2024-02-30").is_none());
    }
}
