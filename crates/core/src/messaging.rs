//! System chat messages
//!
//! Rental decisions post a templated notice into the chat between owner and renter.
//! Rendering and delivery live behind [`SystemMessenger`]; this crate only picks the
//! template and assembles its context.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::domain::listing::UserId;
use crate::domain::rental::{ChatId, RentalRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageTemplate {
    RentalRequested,
    RentalApproved,
    RentalDenied,
    RentalCancelled,
    ExtensionRequested,
    ExtensionApproved,
    ExtensionDenied,
}

impl MessageTemplate {
    pub const ALL: [Self; 7] = [
        Self::RentalRequested,
        Self::RentalApproved,
        Self::RentalDenied,
        Self::RentalCancelled,
        Self::ExtensionRequested,
        Self::ExtensionApproved,
        Self::ExtensionDenied,
    ];

    /// Stable template key understood by the chat backend.
    pub fn key(self) -> &'static str {
        match self {
            Self::RentalRequested => "rental_requested",
            Self::RentalApproved => "rental_approved",
            Self::RentalDenied => "rental_denied",
            Self::RentalCancelled => "rental_cancelled",
            Self::ExtensionRequested => "extension_requested",
            Self::ExtensionApproved => "extension_approved",
            Self::ExtensionDenied => "extension_denied",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|template| template.key() == key)
    }
}

impl fmt::Display for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Template variables, kept as a JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageContext(Map<String, Value>);

impl MessageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_rental(rental: &RentalRequest) -> Self {
        Self::new()
            .with("rental_id", json!(rental.id.0))
            .with("listing_id", json!(rental.listing_id.0))
            .with("start_date", json!(rental.start_date.to_string()))
            .with("end_date", json!(rental.end_date.to_string()))
            .with("days", json!(rental.days()))
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn with_date(self, key: &str, date: NaiveDate) -> Self {
        self.with(key, json!(date.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for MessageContext {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MessagingError {
    #[error("rental has no chat to post into")]
    MissingChat,
    #[error("message delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait SystemMessenger: Send + Sync {
    async fn send_system_message(
        &self,
        chat_id: &ChatId,
        template: MessageTemplate,
        context: MessageContext,
        from: &UserId,
        to: &UserId,
    ) -> Result<(), MessagingError>;
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    use super::{MessageContext, MessageTemplate};
    use crate::domain::listing::{ListingId, UserId};
    use crate::domain::rental::{RentalId, RentalRequest, RentalStatus};

    #[test]
    fn template_keys_round_trip() {
        for template in MessageTemplate::ALL {
            assert_eq!(MessageTemplate::parse(template.key()), Some(template));
        }
        assert_eq!(MessageTemplate::parse("rental_exploded"), None);
    }

    #[test]
    fn rental_context_carries_dates_and_length() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date");
        let rental = RentalRequest {
            id: RentalId("R-9".to_string()),
            listing_id: ListingId("L-3".to_string()),
            owner_id: UserId("owner".to_string()),
            renter_id: UserId("renter".to_string()),
            chat_id: None,
            start_date: day(1),
            end_date: day(4),
            status: RentalStatus::Approved,
            pending_extension: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let context = MessageContext::for_rental(&rental).with_date("previous_end", day(2));

        assert_eq!(context.get("days"), Some(&json!(4)));
        assert_eq!(context.get("start_date"), Some(&json!("2024-05-01")));
        assert_eq!(context.get("previous_end"), Some(&json!("2024-05-02")));
    }
}
