//! Worker calendars with sorted, non-overlapping busy periods.

use chrono::NaiveDateTime;

use super::calendar::add_hours;

/// Tracks busy periods for one worker as half-open `[start, end)` intervals.
///
/// Invariant: `busy_periods` is sorted by start and no two periods overlap
/// or touch, so lookups are a binary search.
#[derive(Clone, Debug)]
pub struct ResourceSchedule {
    pub resource_name: String,
    pub busy_periods: Vec<(NaiveDateTime, NaiveDateTime)>,
}

impl ResourceSchedule {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            busy_periods: Vec::new(),
        }
    }

    /// Mark `[start, end)` busy, merging with any overlapping or touching period.
    pub fn add_busy_period(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        if end <= start {
            return;
        }

        let idx = self.busy_periods.partition_point(|(s, _)| *s < start);

        let mut new_start = start;
        let mut new_end = end;
        let mut merge_start = idx;
        let mut merge_end = idx;

        if idx > 0 {
            let (prev_start, prev_end) = self.busy_periods[idx - 1];
            if prev_end >= start {
                new_start = prev_start;
                new_end = new_end.max(prev_end);
                merge_start = idx - 1;
            }
        }

        while merge_end < self.busy_periods.len() {
            let (next_start, next_end) = self.busy_periods[merge_end];
            if next_start <= new_end {
                new_end = new_end.max(next_end);
                merge_end += 1;
            } else {
                break;
            }
        }

        self.busy_periods.drain(merge_start..merge_end);
        self.busy_periods.insert(merge_start, (new_start, new_end));
    }

    /// First busy period that ends after `current`.
    fn find_next_busy_period(&self, current: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let idx = self.busy_periods.partition_point(|(_, end)| *end <= current);
        self.busy_periods.get(idx).copied()
    }

    /// Earliest instant at or after `from` that is not inside a busy period.
    pub fn next_available_time(&self, from: NaiveDateTime) -> NaiveDateTime {
        match self.find_next_busy_period(from) {
            Some((busy_start, busy_end)) if busy_start <= from => busy_end,
            _ => from,
        }
    }

    /// Earliest start at or after `from` where `hours` of work fit without a gap.
    pub fn next_available_slot(&self, from: NaiveDateTime, hours: f64) -> NaiveDateTime {
        let mut candidate = self.next_available_time(from);
        loop {
            let end = add_hours(candidate, hours);
            match self.find_next_busy_period(candidate) {
                Some((busy_start, busy_end)) if busy_start < end => candidate = busy_end,
                _ => return candidate,
            }
        }
    }

    /// Whether `[start, end)` is entirely free.
    pub fn is_available(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        match self.find_next_busy_period(start) {
            Some((busy_start, _)) => busy_start >= end,
            None => true,
        }
    }

    /// Total busy hours.
    pub fn busy_hours(&self) -> f64 {
        self.busy_periods
            .iter()
            .map(|(s, e)| super::calendar::hours_between(*s, *e))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn busy(periods: &[(u32, u32)]) -> ResourceSchedule {
        let mut schedule = ResourceSchedule::new("w1");
        for &(s, e) in periods {
            schedule.add_busy_period(t(s), t(e));
        }
        schedule
    }

    #[test]
    fn test_empty_schedule() {
        let schedule = ResourceSchedule::new("w1");
        assert_eq!(schedule.next_available_time(t(9)), t(9));
        assert_eq!(schedule.next_available_slot(t(9), 3.0), t(9));
    }

    #[test]
    fn test_next_available_time_during_busy() {
        let schedule = busy(&[(10, 12)]);
        assert_eq!(schedule.next_available_time(t(9)), t(9));
        assert_eq!(schedule.next_available_time(t(11)), t(12));
        // Half-open: the end instant is already free.
        assert_eq!(schedule.next_available_time(t(12)), t(12));
    }

    #[test]
    fn test_touching_periods_merge() {
        let schedule = busy(&[(10, 12), (12, 14)]);
        assert_eq!(schedule.busy_periods, vec![(t(10), t(14))]);
    }

    #[test]
    fn test_overlapping_periods_merge() {
        let schedule = busy(&[(13, 15), (10, 12), (11, 14)]);
        assert_eq!(schedule.busy_periods, vec![(t(10), t(15))]);
    }

    #[test]
    fn test_separate_periods_stay_sorted() {
        let schedule = busy(&[(15, 16), (9, 10)]);
        assert_eq!(schedule.busy_periods, vec![(t(9), t(10)), (t(15), t(16))]);
        assert!((schedule.busy_hours() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_slot_skips_gaps_too_small() {
        let schedule = busy(&[(10, 11), (12, 14)]);
        assert_eq!(schedule.next_available_slot(t(9), 1.0), t(9));
        assert_eq!(schedule.next_available_slot(t(9), 2.0), t(14));
        assert_eq!(schedule.next_available_slot(t(11), 1.0), t(11));
    }

    #[test]
    fn test_is_available() {
        let schedule = busy(&[(10, 12)]);
        assert!(schedule.is_available(t(8), t(10)));
        assert!(!schedule.is_available(t(9), t(11)));
        assert!(!schedule.is_available(t(11), t(13)));
        assert!(schedule.is_available(t(12), t(15)));
    }
}
