//! Date ranges and fetch-window planning.

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::DateRangeError;

/// An inclusive range of dates to harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range, validating that start <= end.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a date range for a single day.
    #[must_use]
    pub const fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Returns the total number of days in the range.
    #[must_use]
    pub fn total_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Returns true if the range contains the given date.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns an iterator over fetch windows of at most `max_days` days.
    ///
    /// Windows are inclusive, contiguous, non-overlapping, and together
    /// cover exactly this range. A `max_days` of zero is treated as one.
    pub fn windows(&self, max_days: u32) -> WindowIterator {
        WindowIterator {
            current: Some(self.start),
            end: self.end,
            max_days: max_days.max(1),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// A bounded sub-range of a [`DateRange`], consumed by a chunked page walk.
///
/// Immutable once planned; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    /// First day covered by the window (inclusive).
    pub start: NaiveDate,
    /// Last day covered by the window (inclusive).
    pub end: NaiveDate,
}

impl FetchWindow {
    /// Returns true if the timestamp falls on a day inside the window.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let date = ts.date_naive();
        date >= self.start && date <= self.end
    }

    /// Returns true if the timestamp falls on a day after the window end.
    #[must_use]
    pub fn is_past(&self, ts: DateTime<Utc>) -> bool {
        ts.date_naive() > self.end
    }

    /// Number of days covered by the window.
    #[must_use]
    pub fn span_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

/// Iterator over the fetch windows of a date range.
#[derive(Debug, Clone)]
pub struct WindowIterator {
    current: Option<NaiveDate>,
    end: NaiveDate,
    max_days: u32,
}

impl Iterator for WindowIterator {
    type Item = FetchWindow;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.current?;

        let last = start
            .checked_add_days(Days::new(u64::from(self.max_days) - 1))
            .unwrap_or(self.end);
        let end = last.min(self.end);

        self.current = if end < self.end {
            end.checked_add_days(Days::new(1))
        } else {
            None
        };

        Some(FetchWindow { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_new() {
        let range = DateRange::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
        assert_eq!(range.total_days(), 365);
    }

    #[test]
    fn test_date_range_invalid() {
        assert!(DateRange::new(date(2024, 1, 31), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_windows_cover_range_exactly() {
        let range = DateRange::new(date(2020, 1, 1), date(2023, 6, 15)).unwrap();
        let windows: Vec<_> = range.windows(365).collect();

        assert_eq!(windows.first().unwrap().start, range.start);
        assert_eq!(windows.last().unwrap().end, range.end);

        // Contiguous and non-overlapping: each window starts the day after
        // the previous one ends.
        for pair in windows.windows(2) {
            assert_eq!(
                pair[1].start,
                pair[0].end.checked_add_days(Days::new(1)).unwrap()
            );
        }

        // Bounded span.
        for w in &windows {
            assert!(w.span_days() <= 365, "window {w} exceeds 365 days");
        }

        // Collective coverage equals the range day count.
        let covered: usize = windows.iter().map(FetchWindow::span_days).sum();
        assert_eq!(covered, range.total_days());
    }

    #[test]
    fn test_windows_single_day_range() {
        let range = DateRange::single_day(date(2024, 2, 29));
        let windows: Vec<_> = range.windows(365).collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, windows[0].end);
    }

    #[test]
    fn test_windows_short_max_days() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 10)).unwrap();
        let windows: Vec<_> = range.windows(4).collect();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].end, date(2024, 1, 4));
        assert_eq!(windows[1].start, date(2024, 1, 5));
        assert_eq!(windows[2].end, date(2024, 1, 10));
    }

    #[test]
    fn test_window_timestamp_checks() {
        let window = FetchWindow {
            start: date(2023, 1, 1),
            end: date(2023, 12, 31),
        };
        let inside = Utc.with_ymd_and_hms(2023, 6, 15, 23, 59, 59).unwrap();
        let past = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(window.contains(inside));
        assert!(!window.contains(past));
        assert!(window.is_past(past));
        assert!(!window.is_past(inside));
    }
}
