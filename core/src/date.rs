//! Date parsing with a strict-then-relative strategy.
//!
//! Input is first tried against a set of strict formats (RFC 3339,
//! `YYYY-MM-DD`, common locale forms, Unix epoch seconds). When none
//! match, the input is interpreted as a relative natural-language date
//! (`yesterday`, `3 days ago`, `in 2 weeks`) against a reference time,
//! which defaults to now and can be pinned for tests.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{ParameterError, Result};

const STRICT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const STRICT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%B %d, %Y"];

/// Parses a date string against the current time as a reference.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    parse_date_with_reference(value, Utc::now())
}

/// Parses a date string, resolving relative phrases against the given
/// reference time.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use param_stack_core::parse_date_with_reference;
///
/// let reference = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
/// let d = parse_date_with_reference("yesterday", reference).unwrap();
/// assert_eq!(d, reference - chrono::Duration::days(1));
///
/// let d = parse_date_with_reference("2024-01-02", reference).unwrap();
/// assert_eq!(d, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
/// ```
pub fn parse_date_with_reference(value: &str, reference: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ParameterError::coercion("date", "empty date string"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in STRICT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in STRICT_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            let naive = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    // bare integers are epoch seconds
    if let Ok(epoch) = trimmed.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(epoch, 0) {
            return Ok(dt);
        }
    }

    parse_relative(trimmed, reference)
        .ok_or_else(|| ParameterError::coercion("date", format!("could not parse date: {value}")))
}

fn parse_relative(value: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = value.to_ascii_lowercase();
    match lower.as_str() {
        "now" | "today" => return Some(reference),
        "yesterday" => return Some(reference - Duration::days(1)),
        "tomorrow" => return Some(reference + Duration::days(1)),
        "last week" => return Some(reference - Duration::weeks(1)),
        "next week" => return Some(reference + Duration::weeks(1)),
        "last month" => return Some(reference - Duration::days(30)),
        "next month" => return Some(reference + Duration::days(30)),
        "last year" => return Some(reference - Duration::days(365)),
        "next year" => return Some(reference + Duration::days(365)),
        _ => {}
    }

    let words: Vec<&str> = lower.split_whitespace().collect();
    match words.as_slice() {
        // "3 days ago", "one hour ago"
        [n, unit, "ago"] => {
            let amount = parse_amount(n)?;
            unit_duration(unit, amount).map(|d| reference - d)
        }
        // "in 2 weeks"
        ["in", n, unit] => {
            let amount = parse_amount(n)?;
            unit_duration(unit, amount).map(|d| reference + d)
        }
        _ => None,
    }
}

fn parse_amount(word: &str) -> Option<i64> {
    match word {
        "a" | "an" | "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        _ => word.parse().ok(),
    }
}

fn unit_duration(unit: &str, amount: i64) -> Option<Duration> {
    let base = unit.trim_end_matches('s');
    match base {
        "second" => Some(Duration::seconds(amount)),
        "minute" => Some(Duration::minutes(amount)),
        "hour" => Some(Duration::hours(amount)),
        "day" => Some(Duration::days(amount)),
        "week" => Some(Duration::weeks(amount)),
        "month" => Some(Duration::days(30 * amount)),
        "year" => Some(Duration::days(365 * amount)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_rfc3339_round_trip() {
        let d = parse_date_with_reference("2024-05-01T10:30:00Z", reference()).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_plain_date() {
        let d = parse_date_with_reference("2024-01-02", reference()).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_locale_date() {
        let d = parse_date_with_reference("01/02/2024", reference()).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_epoch_seconds() {
        let d = parse_date_with_reference("1700000000", reference()).unwrap();
        assert_eq!(d.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_relative_ago() {
        let d = parse_date_with_reference("3 days ago", reference()).unwrap();
        assert_eq!(d, reference() - Duration::days(3));
    }

    #[test]
    fn test_relative_in() {
        let d = parse_date_with_reference("in 2 weeks", reference()).unwrap();
        assert_eq!(d, reference() + Duration::weeks(2));
    }

    #[test]
    fn test_relative_words() {
        let d = parse_date_with_reference("one hour ago", reference()).unwrap();
        assert_eq!(d, reference() - Duration::hours(1));
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_date_with_reference("not a date", reference()).is_err());
    }
}
