use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::{BookedInterval, RawInterval};
use crate::domain::listing::ListingId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerBlockId(pub String);

/// Days the owner has taken off the calendar themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerBlock {
    pub id: OwnerBlockId,
    pub listing_id: ListingId,
    pub interval: BookedInterval,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OwnerBlock {
    pub fn raw_interval(&self) -> RawInterval {
        RawInterval::new(self.interval.start.to_string(), self.interval.end.to_string())
    }
}
