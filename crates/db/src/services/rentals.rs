use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use toolshare_core::availability::{validate_booking_range, BookedInterval, UnavailableDateSet};
use toolshare_core::catalog::{ReferenceDataCache, ReferenceDataSource};
use toolshare_core::domain::listing::{BookingType, Listing, ListingId, UserId};
use toolshare_core::domain::rental::{ChatId, RentalId, RentalRequest, RentalStatus};
use toolshare_core::errors::{ApplicationError, DomainError};
use toolshare_core::messaging::{MessageContext, MessageTemplate, MessagingError, SystemMessenger};

use crate::repositories::{AvailabilityRepository, ListingRepository, RentalRepository};

/// Rental request lifecycle between a renter and a listing owner.
///
/// Each successful decision posts a system message into the rental's chat. Delivery is
/// best effort: a failed send is logged and the decision stands.
///
/// Calls that claim calendar days hold `calendar` from the availability check through
/// the save. Exclusion is per service instance, so one instance must own the writes.
pub struct RentalService {
    rentals: Arc<dyn RentalRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    listings: Arc<dyn ListingRepository>,
    reference: Arc<dyn ReferenceDataSource>,
    cache: Arc<ReferenceDataCache>,
    messenger: Arc<dyn SystemMessenger>,
    calendar: Mutex<()>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Party {
    Owner,
    Renter,
    Either,
}

impl RentalService {
    pub fn new(
        rentals: Arc<dyn RentalRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        listings: Arc<dyn ListingRepository>,
        reference: Arc<dyn ReferenceDataSource>,
        cache: Arc<ReferenceDataCache>,
        messenger: Arc<dyn SystemMessenger>,
    ) -> Self {
        Self {
            rentals,
            availability,
            listings,
            reference,
            cache,
            messenger,
            calendar: Mutex::new(()),
        }
    }

    /// Creates a rental for `start..=end`. Instant-book listings skip the owner's
    /// approval and start out approved.
    pub async fn request(
        &self,
        listing_id: &ListingId,
        renter_id: UserId,
        chat_id: Option<ChatId>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RentalRequest, ApplicationError> {
        let listing = self.listing(listing_id).await?;
        if listing.owner_id == renter_id {
            return Err(DomainError::NotPermitted(format!(
                "user `{renter_id}` owns listing `{listing_id}`"
            ))
            .into());
        }

        let settings = self.cache.platform_settings(self.reference.as_ref()).await?;
        let calendar = self.calendar.lock().await;
        let blocked = self.blocked_days(listing_id).await?;
        validate_booking_range(
            &blocked,
            BookedInterval { start, end },
            listing.draft.min_rental_days,
            settings.max_rental_days,
        )?;

        let now = Utc::now();
        let status = match listing.draft.booking_type {
            BookingType::Instant => RentalStatus::Approved,
            BookingType::Request => RentalStatus::Pending,
        };
        let rental = RentalRequest {
            id: RentalId(Uuid::new_v4().to_string()),
            listing_id: listing.id.clone(),
            owner_id: listing.owner_id.clone(),
            renter_id,
            chat_id,
            start_date: start,
            end_date: end,
            status,
            pending_extension: None,
            created_at: now,
            updated_at: now,
        };
        self.rentals.save(rental.clone()).await?;
        drop(calendar);

        info!(
            event_name = "rental.requested",
            rental_id = %rental.id,
            listing_id = %rental.listing_id,
            status = rental.status.as_str(),
            days = rental.days(),
            "rental requested"
        );

        let context = MessageContext::for_rental(&rental)
            .with("listing_title", json!(listing.display_name()));
        let template = match status {
            RentalStatus::Approved => MessageTemplate::RentalApproved,
            _ => MessageTemplate::RentalRequested,
        };
        self.notify(&rental, template, context, &rental.renter_id, &rental.owner_id).await;
        Ok(rental)
    }

    pub async fn approve(
        &self,
        rental_id: &RentalId,
        acting: &UserId,
    ) -> Result<RentalRequest, ApplicationError> {
        self.decide(rental_id, acting, RentalStatus::Approved, MessageTemplate::RentalApproved)
            .await
    }

    pub async fn deny(
        &self,
        rental_id: &RentalId,
        acting: &UserId,
    ) -> Result<RentalRequest, ApplicationError> {
        self.decide(rental_id, acting, RentalStatus::Denied, MessageTemplate::RentalDenied).await
    }

    /// Either party may cancel a pending or approved rental.
    pub async fn cancel(
        &self,
        rental_id: &RentalId,
        acting: &UserId,
    ) -> Result<RentalRequest, ApplicationError> {
        let mut rental = self.rental(rental_id).await?;
        authorize(&rental, acting, Party::Either)?;

        rental.transition_to(RentalStatus::Cancelled, Utc::now())?;
        self.rentals.save(rental.clone()).await?;
        info!(
            event_name = "rental.cancelled",
            rental_id = %rental.id,
            cancelled_by = %acting,
            "rental cancelled"
        );

        let other = counterpart(&rental, acting);
        self.notify(
            &rental,
            MessageTemplate::RentalCancelled,
            MessageContext::for_rental(&rental).with("cancelled_by", json!(acting.0)),
            acting,
            &other,
        )
        .await;
        Ok(rental)
    }

    /// Renter asks to push the end date out. The added days must be free and the whole
    /// rental must stay within the platform maximum.
    pub async fn request_extension(
        &self,
        rental_id: &RentalId,
        acting: &UserId,
        requested_end: NaiveDate,
    ) -> Result<RentalRequest, ApplicationError> {
        let calendar = self.calendar.lock().await;
        let mut rental = self.rental(rental_id).await?;
        authorize(&rental, acting, Party::Renter)?;

        rental.request_extension(requested_end, Utc::now())?;
        self.check_extension_days(&rental, requested_end).await?;
        self.rentals.save(rental.clone()).await?;
        drop(calendar);

        info!(
            event_name = "rental.extension_requested",
            rental_id = %rental.id,
            requested_end = %requested_end,
            "extension requested"
        );
        self.notify(
            &rental,
            MessageTemplate::ExtensionRequested,
            MessageContext::for_rental(&rental).with_date("requested_end", requested_end),
            &rental.renter_id,
            &rental.owner_id,
        )
        .await;
        Ok(rental)
    }

    /// Availability is checked again: an owner block may have landed since the request.
    pub async fn approve_extension(
        &self,
        rental_id: &RentalId,
        acting: &UserId,
    ) -> Result<RentalRequest, ApplicationError> {
        let calendar = self.calendar.lock().await;
        let mut rental = self.rental(rental_id).await?;
        authorize(&rental, acting, Party::Owner)?;

        let requested_end = rental
            .pending_extension
            .as_ref()
            .map(|extension| extension.requested_end)
            .ok_or_else(|| {
                DomainError::ExtensionNotAllowed(format!(
                    "rental `{}` has no pending extension",
                    rental.id
                ))
            })?;
        self.check_extension_days(&rental, requested_end).await?;

        let previous_end = rental.approve_extension(Utc::now())?;
        self.rentals.save(rental.clone()).await?;
        drop(calendar);

        info!(
            event_name = "rental.extension_approved",
            rental_id = %rental.id,
            previous_end = %previous_end,
            end_date = %rental.end_date,
            "extension approved"
        );
        self.notify(
            &rental,
            MessageTemplate::ExtensionApproved,
            MessageContext::for_rental(&rental).with_date("previous_end", previous_end),
            &rental.owner_id,
            &rental.renter_id,
        )
        .await;
        Ok(rental)
    }

    pub async fn deny_extension(
        &self,
        rental_id: &RentalId,
        acting: &UserId,
    ) -> Result<RentalRequest, ApplicationError> {
        let mut rental = self.rental(rental_id).await?;
        authorize(&rental, acting, Party::Owner)?;

        let extension = rental.deny_extension(Utc::now())?;
        self.rentals.save(rental.clone()).await?;

        info!(event_name = "rental.extension_denied", rental_id = %rental.id, "extension denied");
        self.notify(
            &rental,
            MessageTemplate::ExtensionDenied,
            MessageContext::for_rental(&rental)
                .with_date("requested_end", extension.requested_end),
            &rental.owner_id,
            &rental.renter_id,
        )
        .await;
        Ok(rental)
    }

    /// Requests the owner still has to answer, including open extension requests.
    pub async fn pending_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<RentalRequest>, ApplicationError> {
        Ok(self.rentals.list_pending_for_owner(owner_id).await?)
    }

    pub async fn blocked_days(
        &self,
        listing_id: &ListingId,
    ) -> Result<UnavailableDateSet, ApplicationError> {
        let raw = self.availability.list_blocked_intervals_for_listing(listing_id).await?;
        Ok(UnavailableDateSet::from_raw(&raw))
    }

    async fn decide(
        &self,
        rental_id: &RentalId,
        acting: &UserId,
        next: RentalStatus,
        template: MessageTemplate,
    ) -> Result<RentalRequest, ApplicationError> {
        let mut rental = self.rental(rental_id).await?;
        authorize(&rental, acting, Party::Owner)?;

        rental.transition_to(next, Utc::now())?;
        self.rentals.save(rental.clone()).await?;

        let event_name = match next {
            RentalStatus::Approved => "rental.approved",
            _ => "rental.denied",
        };
        info!(
            event_name,
            rental_id = %rental.id,
            "owner decided rental request"
        );
        self.notify(
            &rental,
            template,
            MessageContext::for_rental(&rental),
            &rental.owner_id,
            &rental.renter_id,
        )
        .await;
        Ok(rental)
    }

    async fn check_extension_days(
        &self,
        rental: &RentalRequest,
        requested_end: NaiveDate,
    ) -> Result<(), ApplicationError> {
        let settings = self.cache.platform_settings(self.reference.as_ref()).await?;
        let total = BookedInterval { start: rental.start_date, end: requested_end };
        if settings.max_rental_days > 0 && total.days() > settings.max_rental_days {
            return Err(DomainError::InvalidBookingRange(format!(
                "{} days exceeds the {}-day maximum",
                total.days(),
                settings.max_rental_days
            ))
            .into());
        }

        // The rental's own days are in the blocked set; only the added days matter.
        let Some(first_added) = rental.end_date.checked_add_days(Days::new(1)) else {
            return Ok(());
        };
        let added = BookedInterval { start: first_added, end: requested_end };
        let blocked = self.blocked_days(&rental.listing_id).await?;
        if added.iter_days().any(|day| blocked.is_blocked(day)) {
            return Err(DomainError::DateCollision { start: added.start, end: added.end }.into());
        }
        Ok(())
    }

    async fn notify(
        &self,
        rental: &RentalRequest,
        template: MessageTemplate,
        context: MessageContext,
        from: &UserId,
        to: &UserId,
    ) {
        let result = match &rental.chat_id {
            Some(chat_id) => {
                self.messenger.send_system_message(chat_id, template, context, from, to).await
            }
            None => Err(MessagingError::MissingChat),
        };

        if let Err(error) = result {
            warn!(
                event_name = "rental.message_failed",
                rental_id = %rental.id,
                template = template.key(),
                error = %error,
                "system message not delivered"
            );
        }
    }

    async fn listing(&self, id: &ListingId) -> Result<Listing, ApplicationError> {
        self.listings
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("listing `{id}`")))
    }

    async fn rental(&self, id: &RentalId) -> Result<RentalRequest, ApplicationError> {
        self.rentals
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("rental `{id}`")))
    }
}

fn authorize(rental: &RentalRequest, acting: &UserId, party: Party) -> Result<(), DomainError> {
    let allowed = match party {
        Party::Owner => &rental.owner_id == acting,
        Party::Renter => &rental.renter_id == acting,
        Party::Either => &rental.owner_id == acting || &rental.renter_id == acting,
    };
    if allowed {
        Ok(())
    } else {
        Err(DomainError::NotPermitted(format!(
            "user `{acting}` cannot act on rental `{}`",
            rental.id
        )))
    }
}

fn counterpart(rental: &RentalRequest, acting: &UserId) -> UserId {
    if &rental.owner_id == acting {
        rental.renter_id.clone()
    } else {
        rental.owner_id.clone()
    }
}
