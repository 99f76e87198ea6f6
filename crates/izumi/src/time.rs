use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

const SECONDS_IN_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;
const SECONDS_IN_MONTH: f64 = 30.0 * 24.0 * 60.0 * 60.0;
const SECONDS_IN_DAY: f64 = 24.0 * 60.0 * 60.0;
const SECONDS_IN_HOUR: f64 = 60.0 * 60.0;
const SECONDS_IN_MINUTE: f64 = 60.0;

// Designator form, e.g. P10Y10M10DT10H10M10.1S
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"P(?:(\d*)Y)?(?:(\d*)M)?(?:(\d*)D)?(?:T(?:(\d*)H)?(?:(\d*)M)?(?:([\d.]*)S)?)?")
        .unwrap()
});

// Date-time form without a timezone suffix, e.g. 2018-04-02T15:27:49.489
static NO_TIMEZONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+-\d+-\d+T\d+:\d+:\d+(\.\d+)?$").unwrap());

/// Parses an ISO 8601 duration into seconds.
///
/// Calendar components use the fixed approximations year = 365 days and
/// month = 30 days; absent components count as zero. Malformed input yields
/// `0.0` rather than an error.
pub fn parse_duration(value: &str) -> f64 {
    let Some(captures) = DURATION_REGEX.captures(value) else {
        return 0.0;
    };

    let component = |index: usize| {
        captures
            .get(index)
            .map(|m| m.as_str())
            .filter(|text| !text.is_empty())
            .and_then(|text| text.parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    component(1) * SECONDS_IN_YEAR
        + component(2) * SECONDS_IN_MONTH
        + component(3) * SECONDS_IN_DAY
        + component(4) * SECONDS_IN_HOUR
        + component(5) * SECONDS_IN_MINUTE
        + component(6)
}

/// Parses an ISO 8601 date-time into seconds since the Unix epoch.
///
/// A date-time without a timezone suffix is taken as UTC; a suffix, when
/// present, is honored. Unparsable input yields `f64::NAN`, which callers
/// must let propagate through their arithmetic.
pub fn parse_date(value: &str) -> f64 {
    let value = if NO_TIMEZONE_REGEX.is_match(value) {
        Cow::Owned(format!("{value}Z"))
    } else {
        Cow::Borrowed(value)
    };

    if let Ok(date_time) = DateTime::parse_from_rfc3339(&value) {
        return date_time.timestamp_millis() as f64 / 1000.0;
    }

    // A bare date counts as midnight UTC
    if let Ok(date) = NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
        if let Some(date_time) = date.and_hms_opt(0, 0, 0) {
            return date_time.and_utc().timestamp_millis() as f64 / 1000.0;
        }
    }

    f64::NAN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("PT30S"), 30.0);
        assert_eq!(parse_duration("PT1M"), 60.0);
        assert_eq!(parse_duration("PT1H10M5.5S"), 4205.5);
        assert_eq!(parse_duration("P1D"), 86400.0);
        assert_eq!(parse_duration("P1M"), 30.0 * 86400.0);
        assert_eq!(parse_duration("P1Y"), 365.0 * 86400.0);
        assert_eq!(parse_duration("P1YT1S"), 365.0 * 86400.0 + 1.0);
    }

    #[test]
    fn test_parse_duration_malformed() {
        assert_eq!(parse_duration(""), 0.0);
        assert_eq!(parse_duration("30S"), 0.0);
        assert_eq!(parse_duration("garbage"), 0.0);
        // designators without digits count as zero
        assert_eq!(parse_duration("PYT"), 0.0);
    }

    #[test]
    fn test_parse_date_with_timezone() {
        assert_eq!(parse_date("1970-01-01T00:00:00Z"), 0.0);
        assert_eq!(parse_date("1970-01-01T01:00:00+01:00"), 0.0);
        assert_eq!(parse_date("2018-04-02T15:27:49Z"), 1522682869.0);
    }

    #[test]
    fn test_parse_date_assumes_utc_without_timezone() {
        assert_eq!(parse_date("2018-04-02T15:27:49"), 1522682869.0);
        assert_eq!(parse_date("2018-04-02T15:27:49.489"), 1522682869.489);
    }

    #[test]
    fn test_parse_date_bare_date() {
        assert_eq!(parse_date("1970-01-02"), 86400.0);
    }

    #[test]
    fn test_parse_date_invalid_is_nan() {
        assert!(parse_date("not a date").is_nan());
        assert!(parse_date("").is_nan());
    }
}
