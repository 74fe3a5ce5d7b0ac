//! Expiration timestamps as exchanged with the configuration service.
//!
//! The service sends `expiresAt` as an RFC 1123 date in GMT, for example
//! `Tue, 15 Nov 1994 08:12:31 GMT`. The same text is written to the cache
//! metadata document.

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

const EXPIRES_AT_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parse a server `expiresAt` value, normalized to UTC.
///
/// Returns `None` for anything that is not a valid RFC 1123 / RFC 2822 date.
pub fn parse_expires_at(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp the way the service sends it.
pub fn format_expires_at(ts: &Timestamp) -> String {
    ts.format(EXPIRES_AT_FORMAT).to_string()
}

/// Strict expiration check: a record expiring exactly at `now` is expired,
/// and a record without a known expiration is always expired.
pub fn is_expired(expires_at: Option<&Timestamp>, now: &Timestamp) -> bool {
    match expires_at {
        Some(expires_at) => expires_at <= now,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_parse_gmt_date() {
        let ts = parse_expires_at("Tue, 15 Nov 1994 08:12:31 GMT").expect("valid date");
        assert_eq!(ts, Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_offset_date_is_normalized() {
        let ts = parse_expires_at("Tue, 15 Nov 1994 10:12:31 +0200").expect("valid date");
        assert_eq!(ts, Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_expires_at("").is_none());
        assert!(parse_expires_at("tomorrow").is_none());
        assert!(parse_expires_at("2030-01-01T00:00:00Z").is_none());
    }

    #[test]
    fn test_format_round_trips_through_parse() {
        let ts = Utc.with_ymd_and_hms(2031, 3, 7, 23, 5, 9).unwrap();
        let text = format_expires_at(&ts);
        assert_eq!(text, "Fri, 07 Mar 2031 23:05:09 GMT");
        assert_eq!(parse_expires_at(&text), Some(ts));
    }

    #[test]
    fn test_is_expired_boundaries() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        assert!(is_expired(Some(&now), &now));
        assert!(is_expired(Some(&(now - Duration::seconds(1))), &now));
        assert!(!is_expired(Some(&(now + Duration::seconds(1))), &now));
        assert!(is_expired(None, &now));
    }
}
