//! Time utility functions

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp as canonical ISO 8601 (UTC, millisecond precision, `Z` suffix)
pub fn datetime_to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Re-render an RFC 3339 string in canonical form, or `None` if it is not a timestamp
pub fn normalize_iso_timestamp(ts: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| datetime_to_iso(&dt.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_to_iso() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(datetime_to_iso(&dt), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_normalize_offset_timestamp() {
        assert_eq!(
            normalize_iso_timestamp("2024-01-01T02:00:00+02:00").as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn test_normalize_subsecond_timestamp() {
        assert_eq!(
            normalize_iso_timestamp("2024-06-15T12:30:45.123456Z").as_deref(),
            Some("2024-06-15T12:30:45.123Z")
        );
    }

    #[test]
    fn test_normalize_rejects_non_timestamps() {
        assert_eq!(normalize_iso_timestamp("2024-01-01"), None);
        assert_eq!(normalize_iso_timestamp("active"), None);
        assert_eq!(normalize_iso_timestamp(""), None);
    }
}
