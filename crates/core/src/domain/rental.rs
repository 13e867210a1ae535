use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::BookedInterval;
use crate::domain::listing::{ListingId, UserId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RentalId(pub String);

impl fmt::Display for RentalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Pending,
    Approved,
    Denied,
    Active,
    Completed,
    Cancelled,
}

impl RentalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether a rental in this status occupies its dates on the calendar.
    pub fn blocks_calendar(self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Active)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRequest {
    pub requested_end: NaiveDate,
    pub requested_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalRequest {
    pub id: RentalId,
    pub listing_id: ListingId,
    pub owner_id: UserId,
    pub renter_id: UserId,
    pub chat_id: Option<ChatId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: RentalStatus,
    pub pending_extension: Option<ExtensionRequest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalRequest {
    fn no_pending_extension(&self) -> DomainError {
        DomainError::ExtensionNotAllowed(format!("rental `{}` has no pending extension", self.id))
    }

    pub fn interval(&self) -> BookedInterval {
        BookedInterval { start: self.start_date, end: self.end_date }
    }

    /// Inclusive day count.
    pub fn days(&self) -> u32 {
        self.interval().days()
    }

    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        matches!(
            (self.status, next),
            (RentalStatus::Pending, RentalStatus::Approved)
                | (RentalStatus::Pending, RentalStatus::Denied)
                | (RentalStatus::Pending, RentalStatus::Cancelled)
                | (RentalStatus::Approved, RentalStatus::Active)
                | (RentalStatus::Approved, RentalStatus::Cancelled)
                | (RentalStatus::Active, RentalStatus::Completed)
        )
    }

    pub fn transition_to(
        &mut self,
        next: RentalStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidRentalTransition { from: self.status, to: next });
        }

        self.status = next;
        self.updated_at = at;
        if !matches!(next, RentalStatus::Approved | RentalStatus::Active) {
            self.pending_extension = None;
        }
        Ok(())
    }

    pub fn request_extension(
        &mut self,
        requested_end: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !matches!(self.status, RentalStatus::Approved | RentalStatus::Active) {
            return Err(DomainError::ExtensionNotAllowed(format!(
                "rental `{}` is {}",
                self.id,
                self.status.as_str()
            )));
        }
        if self.pending_extension.is_some() {
            return Err(DomainError::ExtensionNotAllowed(format!(
                "rental `{}` already has a pending extension",
                self.id
            )));
        }
        if requested_end <= self.end_date {
            return Err(DomainError::ExtensionNotAllowed(format!(
                "requested end {requested_end} is not after current end {}",
                self.end_date
            )));
        }

        self.pending_extension = Some(ExtensionRequest { requested_end, requested_at: at });
        self.updated_at = at;
        Ok(())
    }

    /// Applies the pending extension and returns the previous end date.
    pub fn approve_extension(&mut self, at: DateTime<Utc>) -> Result<NaiveDate, DomainError> {
        let extension =
            self.pending_extension.take().ok_or_else(|| self.no_pending_extension())?;
        let previous_end = self.end_date;
        self.end_date = extension.requested_end;
        self.updated_at = at;
        Ok(previous_end)
    }

    pub fn deny_extension(&mut self, at: DateTime<Utc>) -> Result<ExtensionRequest, DomainError> {
        let extension =
            self.pending_extension.take().ok_or_else(|| self.no_pending_extension())?;
        self.updated_at = at;
        Ok(extension)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{ListingId, RentalId, RentalRequest, RentalStatus, UserId};
    use crate::errors::DomainError;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).expect("valid date")
    }

    fn rental(status: RentalStatus) -> RentalRequest {
        RentalRequest {
            id: RentalId("R-1".to_string()),
            listing_id: ListingId("L-1".to_string()),
            owner_id: UserId("owner".to_string()),
            renter_id: UserId("renter".to_string()),
            chat_id: None,
            start_date: date(10),
            end_date: date(12),
            status,
            pending_extension: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn pending_rental_can_be_approved_or_denied() {
        let mut approved = rental(RentalStatus::Pending);
        approved.transition_to(RentalStatus::Approved, Utc::now()).expect("pending->approved");
        assert_eq!(approved.status, RentalStatus::Approved);

        let mut denied = rental(RentalStatus::Pending);
        denied.transition_to(RentalStatus::Denied, Utc::now()).expect("pending->denied");
        assert_eq!(denied.status, RentalStatus::Denied);
    }

    #[test]
    fn terminal_rentals_reject_transitions() {
        let mut denied = rental(RentalStatus::Denied);
        let error =
            denied.transition_to(RentalStatus::Approved, Utc::now()).expect_err("denied is final");
        assert!(matches!(error, DomainError::InvalidRentalTransition { .. }));
    }

    #[test]
    fn days_are_inclusive() {
        assert_eq!(rental(RentalStatus::Pending).days(), 3);
    }

    #[test]
    fn extension_lifecycle() {
        let mut rental = rental(RentalStatus::Approved);
        rental.request_extension(date(15), Utc::now()).expect("extension requested");
        assert!(rental.request_extension(date(16), Utc::now()).is_err());

        let previous_end = rental.approve_extension(Utc::now()).expect("extension approved");
        assert_eq!(previous_end, date(12));
        assert_eq!(rental.end_date, date(15));
        assert!(rental.pending_extension.is_none());
    }

    #[test]
    fn extension_must_move_end_forward_on_live_rental() {
        let mut pending = rental(RentalStatus::Pending);
        assert!(pending.request_extension(date(15), Utc::now()).is_err());

        let mut approved = rental(RentalStatus::Approved);
        assert!(approved.request_extension(date(12), Utc::now()).is_err());
        assert!(approved.deny_extension(Utc::now()).is_err());
    }

    #[test]
    fn only_live_rentals_block_calendar() {
        assert!(RentalStatus::Pending.blocks_calendar());
        assert!(RentalStatus::Active.blocks_calendar());
        assert!(!RentalStatus::Denied.blocks_calendar());
        assert!(!RentalStatus::Completed.blocks_calendar());
    }
}
