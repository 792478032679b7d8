//! Canonical civil date/time arithmetic
//!
//! All dates in the platform are timezone-naive civil dates. Day-of-week
//! and interval computations must go through this module so that every
//! component agrees on them; no other day-of-week calculation may exist
//! in the workspace.
//!
//! Time ranges are half-open `[start, end)`: ranges that merely touch
//! (one ends exactly where the other starts) do not overlap.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Day of week for a civil date, 0 = Sunday through 6 = Saturday.
#[must_use]
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A wall-clock time interval within a single day, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Build a range, returning `None` unless `start < end`.
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Whether two half-open ranges share any instant.
    #[must_use]
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely within this range.
    #[must_use]
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Sort and coalesce overlapping or touching ranges into a minimal,
/// chronologically ordered, disjoint set.
#[must_use]
pub fn merge_ranges(mut ranges: Vec<TimeRange>) -> Vec<TimeRange> {
    ranges.sort();

    let mut merged: Vec<TimeRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                if range.end > last.end {
                    last.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }

    merged
}

/// Remove every `busy` interval from the `windows`, leaving the free
/// remainder. Both inputs must be merged (sorted and disjoint); use
/// [`merge_ranges`] first.
#[must_use]
pub fn subtract_ranges(windows: &[TimeRange], busy: &[TimeRange]) -> Vec<TimeRange> {
    let mut free = Vec::new();

    for window in windows {
        let mut cursor = window.start;

        for block in busy {
            if block.end <= cursor {
                continue;
            }
            if block.start >= window.end {
                break;
            }
            if block.start > cursor {
                free.push(TimeRange {
                    start: cursor,
                    end: block.start,
                });
            }
            cursor = cursor.max(block.end);
            if cursor >= window.end {
                break;
            }
        }

        if cursor < window.end {
            free.push(TimeRange {
                start: cursor,
                end: window.end,
            });
        }
    }

    free
}

/// Cut free ranges into consecutive slots of exactly
/// `granularity_minutes`, dropping any remainder shorter than the
/// granularity.
#[must_use]
pub fn discretize(free: &[TimeRange], granularity_minutes: u32) -> Vec<TimeRange> {
    let step = Duration::minutes(i64::from(granularity_minutes));
    let mut slots = Vec::new();

    for range in free {
        let mut start = range.start;
        loop {
            // overflow into the next day means the slot does not fit
            let (end, wrapped) = start.overflowing_add_signed(step);
            if wrapped != 0 || end > range.end || end <= start {
                break;
            }
            slots.push(TimeRange { start, end });
            start = end;
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn range(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
        TimeRange::new(t(sh, sm), t(eh, em)).expect("valid range")
    }

    #[test]
    fn day_of_week_is_sunday_based() {
        // 2025-01-05 was a Sunday
        let sunday = NaiveDate::from_ymd_opt(2025, 1, 5).expect("valid date");
        assert_eq!(day_of_week(sunday), 0);
        assert_eq!(day_of_week(sunday + Duration::days(1)), 1);
        assert_eq!(day_of_week(sunday + Duration::days(6)), 6);
    }

    #[test]
    fn day_of_week_handles_leap_day() {
        // 2024-02-29 was a Thursday
        let leap = NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date");
        assert_eq!(day_of_week(leap), 4);
    }

    #[test]
    fn new_rejects_inverted_and_empty_ranges() {
        assert!(TimeRange::new(t(10, 0), t(9, 0)).is_none());
        assert!(TimeRange::new(t(10, 0), t(10, 0)).is_none());
        assert!(TimeRange::new(t(9, 0), t(10, 0)).is_some());
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let morning = range(9, 0, 10, 0);
        let next = range(10, 0, 11, 0);
        assert!(!morning.overlaps(&next));
        assert!(morning.overlaps(&range(9, 30, 10, 30)));
    }

    #[test]
    fn merge_coalesces_overlapping_and_touching() {
        let merged = merge_ranges(vec![
            range(13, 0, 14, 0),
            range(9, 0, 10, 30),
            range(10, 0, 11, 0),
            range(11, 0, 12, 0),
        ]);
        assert_eq!(merged, vec![range(9, 0, 12, 0), range(13, 0, 14, 0)]);
    }

    #[test]
    fn merge_of_empty_input_is_empty() {
        assert!(merge_ranges(Vec::new()).is_empty());
    }

    #[test]
    fn subtract_splits_window_around_block() {
        let free = subtract_ranges(&[range(9, 0, 17, 0)], &[range(12, 0, 13, 0)]);
        assert_eq!(free, vec![range(9, 0, 12, 0), range(13, 0, 17, 0)]);
    }

    #[test]
    fn subtract_clips_partial_overlaps() {
        let free = subtract_ranges(
            &[range(9, 0, 12, 0)],
            &[range(8, 0, 9, 30), range(11, 30, 13, 0)],
        );
        assert_eq!(free, vec![range(9, 30, 11, 30)]);
    }

    #[test]
    fn subtract_consumes_fully_covered_window() {
        let free = subtract_ranges(&[range(10, 0, 11, 0)], &[range(9, 0, 12, 0)]);
        assert!(free.is_empty());
    }

    #[test]
    fn subtract_with_no_busy_returns_windows() {
        let free = subtract_ranges(&[range(9, 0, 10, 0)], &[]);
        assert_eq!(free, vec![range(9, 0, 10, 0)]);
    }

    #[test]
    fn discretize_drops_short_remainder() {
        let slots = discretize(&[range(10, 0, 11, 15)], 30);
        assert_eq!(slots, vec![range(10, 0, 10, 30), range(10, 30, 11, 0)]);
    }

    #[test]
    fn discretize_drops_ranges_shorter_than_granularity() {
        assert!(discretize(&[range(10, 0, 10, 20)], 30).is_empty());
    }

    #[test]
    fn discretize_never_produces_overlaps() {
        let slots = discretize(&[range(9, 0, 12, 0), range(13, 0, 14, 0)], 30);
        for pair in slots.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(slots.len(), 8);
    }

    #[test]
    fn discretize_stops_at_end_of_day() {
        let slots = discretize(&[range(23, 0, 23, 59)], 30);
        assert_eq!(slots, vec![range(23, 0, 23, 30)]);
    }

    // The worked scheduling scenario: a one-off window 10:00-12:00
    // (which overrides the wider recurring window upstream), minus an
    // unavailability block 10:30-11:00, discretized at 30 minutes.
    #[test]
    fn scenario_one_off_window_minus_block() {
        let windows = merge_ranges(vec![range(10, 0, 12, 0)]);
        let busy = merge_ranges(vec![range(10, 30, 11, 0), range(13, 0, 14, 0)]);
        let slots = discretize(&subtract_ranges(&windows, &busy), 30);
        assert_eq!(
            slots,
            vec![
                range(10, 0, 10, 30),
                range(11, 0, 11, 30),
                range(11, 30, 12, 0),
            ]
        );
    }
}
