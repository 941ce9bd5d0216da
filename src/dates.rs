//! Lenient date parsing for request bodies.
//!
//! Date inputs post `2024-09-01`, while clients that round-trip a previous
//! response may send a timestamp such as `2024-09-01T00:00:00` or an RFC 3339
//! value. Only the calendar date is kept.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// `deserialize_with` helper for `Option<NaiveDate>` fields. A missing or
/// `null` value becomes `None` so the required-field check can report it.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_date_and_timestamp_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 1);
        assert_eq!(parse_date("2024-09-01"), expected);
        assert_eq!(parse_date("2024-09-01T00:00:00"), expected);
        assert_eq!(parse_date("2024-09-01T08:30:00.123"), expected);
        assert_eq!(parse_date("2024-09-01T23:00:00Z"), expected);
        assert_eq!(parse_date("09/01/2024"), None);
    }
}
