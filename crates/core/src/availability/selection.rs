use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::availability::calendar::{BookedInterval, UnavailableDateSet};
use crate::errors::DomainError;

/// What a calendar does when a picked range swallows a blocked day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Drop the range and restart the selection on the day just picked.
    #[default]
    CollapseToSingleDay,
    /// Keep the anchor and report the collision.
    Reject,
}

impl CollisionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CollapseToSingleDay => "collapse_to_single_day",
            Self::Reject => "reject",
        }
    }
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "collapse_to_single_day" | "collapse" => Ok(Self::CollapseToSingleDay),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unsupported collision policy `{other}` (expected collapse_to_single_day|reject)"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Empty,
    Anchored(NaiveDate),
    Range(BookedInterval),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    Unchanged,
    Anchored(NaiveDate),
    Selected(BookedInterval),
    Collapsed(NaiveDate),
}

/// Two-click range picker over a calendar with disabled days.
#[derive(Clone, Debug)]
pub struct DateRangeSelection {
    blocked: UnavailableDateSet,
    policy: CollisionPolicy,
    state: SelectionState,
}

impl DateRangeSelection {
    pub fn new(blocked: UnavailableDateSet, policy: CollisionPolicy) -> Self {
        Self { blocked, policy, state: SelectionState::Empty }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn selected_range(&self) -> Option<BookedInterval> {
        match self.state {
            SelectionState::Empty => None,
            SelectionState::Anchored(day) => Some(BookedInterval::single(day)),
            SelectionState::Range(range) => Some(range),
        }
    }

    pub fn clear(&mut self) {
        self.state = SelectionState::Empty;
    }

    pub fn pick(&mut self, day: NaiveDate) -> Result<SelectionOutcome, DomainError> {
        if self.blocked.is_blocked(day) {
            return Ok(SelectionOutcome::Unchanged);
        }

        let anchor = match self.state {
            SelectionState::Anchored(anchor) if day >= anchor => anchor,
            _ => {
                self.state = SelectionState::Anchored(day);
                return Ok(SelectionOutcome::Anchored(day));
            }
        };

        if !self.blocked.has_collision(anchor, day) {
            let range = BookedInterval { start: anchor, end: day };
            self.state = SelectionState::Range(range);
            return Ok(SelectionOutcome::Selected(range));
        }

        match self.policy {
            CollisionPolicy::CollapseToSingleDay => {
                self.state = SelectionState::Anchored(day);
                Ok(SelectionOutcome::Collapsed(day))
            }
            CollisionPolicy::Reject => Err(DomainError::DateCollision { start: anchor, end: day }),
        }
    }
}

/// Server-side check for a requested booking: stricter than the picker because the
/// request may not have come through a calendar at all.
pub fn validate_booking_range(
    blocked: &UnavailableDateSet,
    range: BookedInterval,
    min_days: u32,
    max_days: u32,
) -> Result<(), DomainError> {
    if range.end < range.start {
        return Err(DomainError::InvalidBookingRange(format!(
            "end {} is before start {}",
            range.end, range.start
        )));
    }

    let days = range.days();
    if days < min_days.max(1) {
        return Err(DomainError::InvalidBookingRange(format!(
            "{days} day(s) is shorter than the {min_days}-day minimum"
        )));
    }
    if max_days > 0 && days > max_days {
        return Err(DomainError::InvalidBookingRange(format!(
            "{days} days exceeds the {max_days}-day maximum"
        )));
    }

    if blocked.is_blocked(range.start)
        || blocked.is_blocked(range.end)
        || blocked.has_collision(range.start, range.end)
    {
        return Err(DomainError::DateCollision { start: range.start, end: range.end });
    }

    Ok(())
}
