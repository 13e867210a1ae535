use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::availability::normalize::normalize_endpoint;

/// An interval exactly as the backend hands it over. Endpoints may be bare dates or
/// full timestamps, and either may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInterval {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RawInterval {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: Some(start.into()), end: Some(end.into()) }
    }

    pub fn normalize(&self) -> Option<BookedInterval> {
        let start = normalize_endpoint(self.start.as_deref()?)?;
        let end = normalize_endpoint(self.end.as_deref()?)?;
        (start <= end).then_some(BookedInterval { start, end })
    }
}

/// Inclusive range of calendar days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookedInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BookedInterval {
    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn days(&self) -> u32 {
        u32::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Every calendar day covered by at least one booking or owner block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnavailableDateSet {
    days: BTreeSet<NaiveDate>,
}

impl UnavailableDateSet {
    pub fn from_intervals<'a>(intervals: impl IntoIterator<Item = &'a BookedInterval>) -> Self {
        let mut set = Self::default();
        for interval in intervals {
            set.days.extend(interval.iter_days());
        }
        set
    }

    /// Normalizes and expands raw backend intervals, skipping malformed ones.
    pub fn from_raw<'a>(intervals: impl IntoIterator<Item = &'a RawInterval>) -> Self {
        let mut set = Self::default();
        for raw in intervals {
            match raw.normalize() {
                Some(interval) => set.days.extend(interval.iter_days()),
                None => debug!(
                    event_name = "availability.interval_skipped",
                    start = raw.start.as_deref().unwrap_or("<missing>"),
                    end = raw.end.as_deref().unwrap_or("<missing>"),
                    "skipping malformed interval"
                ),
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn is_blocked(&self, day: NaiveDate) -> bool {
        self.days.contains(&day)
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().copied()
    }

    /// True when a blocked day lies strictly between `start` and `end`.
    /// Endpoints themselves are not checked; calendars disable those days already.
    pub fn has_collision(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let (low, high) = if start <= end { (start, end) } else { (end, start) };
        let Some(after_low) = low.checked_add_days(Days::new(1)) else {
            return false;
        };
        if after_low >= high {
            return false;
        }
        self.days.range(after_low..high).next().is_some()
    }

    pub fn first_blocked_after(&self, day: NaiveDate) -> Option<NaiveDate> {
        let after = day.checked_add_days(Days::new(1))?;
        self.days.range(after..).next().copied()
    }

    /// Collapses consecutive days back into inclusive intervals.
    pub fn to_intervals(&self) -> Vec<BookedInterval> {
        let mut intervals: Vec<BookedInterval> = Vec::new();
        for day in self.iter() {
            match intervals.last_mut() {
                Some(last) if last.end.succ_opt() == Some(day) => last.end = day,
                _ => intervals.push(BookedInterval::single(day)),
            }
        }
        intervals
    }
}
