//! Time window for history queries.

use time::{Duration, OffsetDateTime};

/// Closed interval `[start, end]` that a history series spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl HistoryWindow {
    /// Span used when the caller gives no bounds, or only one of them.
    pub const DEFAULT_SPAN: Duration = Duration::hours(24);

    /// Resolve optional caller bounds against `now`.
    ///
    /// Missing `end` means now; missing `start` means one default span
    /// before `end`. Reversed bounds are swapped.
    pub fn resolve(
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Self {
        let end = end.unwrap_or(now);
        let start = start.unwrap_or(end - Self::DEFAULT_SPAN);
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// The trailing default span ending at `now`.
    pub fn trailing(now: OffsetDateTime) -> Self {
        Self::resolve(None, None, now)
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// `count` evenly spaced instants; the first is `start` and, for
    /// `count >= 2`, the last is `end`.
    ///
    /// Instants are rounded up to whole milliseconds, the precision of the
    /// wire format, so that none of them prints earlier than `start`.
    /// `end` is left as is: truncating it on output keeps it within bounds.
    pub fn sample_times(&self, count: usize) -> Vec<OffsetDateTime> {
        let Some(last) = count.checked_sub(1) else {
            return Vec::new();
        };
        if last == 0 {
            return vec![ceil_to_millisecond(self.start).min(self.end)];
        }

        let span = self.span();
        let last = last as f64;
        (0..count)
            .map(|i| self.start + span * (i as f64 / last))
            .map(|t| ceil_to_millisecond(t).min(self.end))
            .collect()
    }
}

fn ceil_to_millisecond(t: OffsetDateTime) -> OffsetDateTime {
    match t.nanosecond() % 1_000_000 {
        0 => t,
        sub => t + Duration::nanoseconds(i64::from(1_000_000 - sub)),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::types::{format_rfc3339, parse_rfc3339};

    const NOW: OffsetDateTime = datetime!(2026-10-18 12:00 UTC);

    #[test]
    fn defaults_to_trailing_day() {
        let window = HistoryWindow::resolve(None, None, NOW);
        assert_eq!(window.end, NOW);
        assert_eq!(window.start, datetime!(2026-10-17 12:00 UTC));
        assert_eq!(window, HistoryWindow::trailing(NOW));
    }

    #[test]
    fn start_only_runs_until_now() {
        let start = datetime!(2026-10-18 06:00 UTC);
        let window = HistoryWindow::resolve(Some(start), None, NOW);
        assert_eq!(window.start, start);
        assert_eq!(window.end, NOW);
    }

    #[test]
    fn end_only_spans_one_day_back() {
        let end = datetime!(2026-10-10 00:00 UTC);
        let window = HistoryWindow::resolve(None, Some(end), NOW);
        assert_eq!(window.start, datetime!(2026-10-09 00:00 UTC));
        assert_eq!(window.end, end);
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let a = datetime!(2026-10-18 06:00 UTC);
        let b = datetime!(2026-10-18 08:00 UTC);
        let window = HistoryWindow::resolve(Some(b), Some(a), NOW);
        assert_eq!(window.start, a);
        assert_eq!(window.end, b);
    }

    #[test]
    fn samples_cover_window_inclusively() {
        let window = HistoryWindow::trailing(NOW);
        let times = window.sample_times(48);

        assert_eq!(times.len(), 48);
        assert_eq!(times[0], window.start);
        assert_eq!(*times.last().unwrap(), window.end);
        assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn samples_round_up_to_wire_precision() {
        let start = datetime!(2026-10-18 00:00:00.0005 UTC);
        let end = datetime!(2026-10-18 06:00:00.0007 UTC);
        let times = HistoryWindow { start, end }.sample_times(48);

        assert_eq!(times[0], datetime!(2026-10-18 00:00:00.001 UTC));
        assert_eq!(*times.last().unwrap(), end);
        assert!(times.iter().all(|t| t.nanosecond() % 1_000_000 == 0 || *t == end));

        let first_on_wire = parse_rfc3339(&format_rfc3339(times[0])).unwrap();
        let last_on_wire = parse_rfc3339(&format_rfc3339(end)).unwrap();
        assert!(first_on_wire >= start);
        assert!(last_on_wire <= end);
    }

    #[test]
    fn degenerate_sample_counts() {
        let window = HistoryWindow::trailing(NOW);
        assert!(window.sample_times(0).is_empty());
        assert_eq!(window.sample_times(1), vec![window.start]);
    }
}
