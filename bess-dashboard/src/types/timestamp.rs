//! RFC 3339 helpers for the wire format.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Format with millisecond precision in UTC, e.g.
/// `2026-10-18T09:30:00.125Z`.
pub fn format_rfc3339(t: OffsetDateTime) -> String {
    let t = t.to_offset(time::UtcOffset::UTC);
    let t = t
        .replace_nanosecond(u32::from(t.millisecond()) * 1_000_000)
        .unwrap_or(t);
    t.format(&Rfc3339)
        .unwrap_or_else(|_| t.unix_timestamp().to_string())
}

/// Parse an RFC 3339 timestamp, returning `None` when malformed.
pub fn parse_rfc3339(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s.trim(), &Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn formats_utc_with_milliseconds() {
        let t = datetime!(2026-10-18 09:30:00.125999 UTC);
        assert_eq!(format_rfc3339(t), "2026-10-18T09:30:00.125Z");
    }

    #[test]
    fn converts_offsets_to_utc() {
        let t = datetime!(2026-10-18 17:30:00 +8);
        assert_eq!(format_rfc3339(t), "2026-10-18T09:30:00Z");
    }

    #[test]
    fn parses_browser_iso_strings() {
        let t = parse_rfc3339("2026-10-18T09:30:00.000Z").unwrap();
        assert_eq!(t, datetime!(2026-10-18 09:30:00 UTC));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_rfc3339("yesterday"), None);
        assert_eq!(parse_rfc3339(""), None);
    }
}
