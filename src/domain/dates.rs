//! Normalisation of the date shapes found on the wire.
//!
//! Timestamps arrive as `{_seconds,_nanoseconds}` (admin SDK JSON), as
//! `{seconds,nanos}`, as epoch milliseconds, or as strings. They are
//! unified here, at decode time, so the rest of the crate only sees
//! `chrono` values.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawDate {
    AdminTimestamp {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(rename = "_nanoseconds", default)]
        nanos: u32,
    },
    Timestamp {
        seconds: i64,
        #[serde(default)]
        nanos: u32,
    },
    Millis(i64),
    Text(String),
    Other(serde_json::Value),
}

/// A date value after parsing, before choosing a calendar projection.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Parsed {
    Instant(DateTime<Utc>),
    Naive(NaiveDateTime),
    Day(NaiveDate),
}

fn parse_text(text: &str) -> Option<Parsed> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(Parsed::Instant(instant.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Parsed::Naive(naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().map(Parsed::Day)
}

fn parse_raw(raw: RawDate) -> Option<Parsed> {
    match raw {
        RawDate::AdminTimestamp { seconds, nanos } | RawDate::Timestamp { seconds, nanos } => {
            Utc.timestamp_opt(seconds, nanos).single().map(Parsed::Instant)
        }
        RawDate::Millis(millis) => Utc.timestamp_millis_opt(millis).single().map(Parsed::Instant),
        RawDate::Text(text) => parse_text(&text),
        RawDate::Other(_) => None,
    }
}

impl Parsed {
    fn local_date(self) -> NaiveDate {
        match self {
            Parsed::Instant(instant) => instant.with_timezone(&Local).date_naive(),
            Parsed::Naive(naive) => naive.date(),
            Parsed::Day(day) => day,
        }
    }

    fn instant(self) -> Option<DateTime<Utc>> {
        match self {
            Parsed::Instant(instant) => Some(instant),
            Parsed::Naive(naive) => Local.from_local_datetime(&naive).earliest().map(|t| t.with_timezone(&Utc)),
            Parsed::Day(day) => day
                .and_hms_opt(0, 0, 0)
                .and_then(|naive| Local.from_local_datetime(&naive).earliest())
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// Parses a user-entered or stored date string into a local calendar day.
pub fn parse_local_date(text: &str) -> Option<NaiveDate> {
    parse_text(text).map(Parsed::local_date)
}

/// Serde adapter: any supported shape to a local calendar day, time of day discarded.
pub fn local_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawDate>::deserialize(deserializer)?;
    Ok(raw.and_then(parse_raw).map(Parsed::local_date))
}

/// Serde adapter: any supported shape to an instant.
pub fn instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawDate>::deserialize(deserializer)?;
    Ok(raw.and_then(parse_raw).and_then(Parsed::instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Dated {
        #[serde(default, deserialize_with = "local_date")]
        day: Option<NaiveDate>,
        #[serde(default, deserialize_with = "instant")]
        at: Option<DateTime<Utc>>,
    }

    fn day(json: &str) -> Option<NaiveDate> {
        serde_json::from_str::<Dated>(json).unwrap().day
    }

    #[test]
    fn naive_datetime_keeps_written_day() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 8);
        assert_eq!(day(r#"{"day":"2025-08-08T00:00:00"}"#), expected);
        assert_eq!(day(r#"{"day":"2025-08-08T23:59:59.500"}"#), expected);
        assert_eq!(day(r#"{"day":"2025-08-08"}"#), expected);
    }

    #[test]
    fn admin_timestamp_shape_decodes() {
        let dated: Dated = serde_json::from_str(r#"{"at":{"_seconds":1754611200,"_nanoseconds":0}}"#).unwrap();
        assert_eq!(dated.at.unwrap().timestamp(), 1_754_611_200);
        let dated: Dated = serde_json::from_str(r#"{"at":{"seconds":1754611200,"nanos":0}}"#).unwrap();
        assert_eq!(dated.at.unwrap().timestamp(), 1_754_611_200);
    }

    #[test]
    fn garbage_and_missing_become_none() {
        assert_eq!(day(r#"{"day":"not a date"}"#), None);
        assert_eq!(day(r#"{"day":null}"#), None);
        assert_eq!(day(r#"{"day":true}"#), None);
        assert_eq!(day(r#"{}"#), None);
    }

    #[test]
    fn parse_local_date_trims_input() {
        assert_eq!(parse_local_date(" 2025-12-24 "), NaiveDate::from_ymd_opt(2025, 12, 24));
        assert_eq!(parse_local_date("24/12/2025"), None);
    }
}
