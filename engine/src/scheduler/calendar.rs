//! Working-hours calendar and hour/duration conversions.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Convert fractional hours to a `chrono::Duration`, rounded to the millisecond.
///
/// Saturates at the representable range; NaN converts to zero.
pub fn hours_to_duration(hours: f64) -> Duration {
    let millis = (hours * MILLIS_PER_HOUR).round() as i64;
    Duration::milliseconds(millis.max(-i64::MAX))
}

pub fn duration_to_hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Hours from `base` to `instant` (negative if `instant` is earlier).
pub fn hours_between(base: NaiveDateTime, instant: NaiveDateTime) -> f64 {
    duration_to_hours(instant - base)
}

/// `instant` moved by `hours`, clamped to the calendar's range.
pub fn add_hours(instant: NaiveDateTime, hours: f64) -> NaiveDateTime {
    let offset = hours_to_duration(hours);
    instant.checked_add_signed(offset).unwrap_or(if offset < Duration::zero() {
        NaiveDateTime::MIN
    } else {
        NaiveDateTime::MAX
    })
}

/// Maps working effort onto calendar time.
///
/// Effort is split into whole working days and a remainder: each whole day
/// advances the clock by one calendar day, then the remainder is added as
/// plain hours.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub hours_per_day: f64,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self { hours_per_day: 8.0 }
    }
}

impl WorkingHours {
    pub fn new(hours_per_day: f64) -> Self {
        Self { hours_per_day }
    }

    /// End instant for `hours` of effort starting at `start`.
    pub fn end_time(&self, start: NaiveDateTime, hours: f64) -> NaiveDateTime {
        if self.hours_per_day <= 0.0 {
            return add_hours(start, hours);
        }
        let whole_days = (hours / self.hours_per_day).floor();
        let remainder = hours - whole_days * self.hours_per_day;
        add_hours(add_hours(start, whole_days * 24.0), remainder)
    }
}

/// End instant with an optional calendar; without one effort is wall-clock time.
pub fn end_time(start: NaiveDateTime, hours: f64, calendar: Option<&WorkingHours>) -> NaiveDateTime {
    match calendar {
        Some(calendar) => calendar.end_time(start, hours),
        None => add_hours(start, hours),
    }
}
