use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::category::{Category, CategoryId};
use crate::domain::tier::RiskTier;
use crate::pricing::financials::{effective_tier, validate_tier_override};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    #[default]
    Request,
    Instant,
}

impl BookingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Instant => "instant",
        }
    }
}

impl std::str::FromStr for BookingType {
    type Err = ListingValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(Self::Request),
            "instant" => Ok(Self::Instant),
            other => Err(ListingValidationError::UnknownBookingType(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupWindow {
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
}

/// Limits applied when a draft is submitted. Built from `ListingConfig`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingPolicy {
    pub manual_url_prefix: String,
    pub min_images: usize,
    pub max_images: usize,
}

impl Default for ListingPolicy {
    fn default() -> Self {
        Self {
            manual_url_prefix: "https://www.manualslib.com/".to_string(),
            min_images: 2,
            max_images: 5,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ListingValidationError {
    #[error("`{0}` is required")]
    MissingField(&'static str),
    #[error("daily price must be greater than zero")]
    InvalidDailyPrice,
    #[error("a listing needs between {min} and {max} photos, got {count}")]
    ImageCount { count: usize, min: usize, max: usize },
    #[error("barter listings must use request booking")]
    BarterRequiresRequestBooking,
    #[error("minimum rental length must be at least one day")]
    InvalidMinRentalDays,
    #[error("pickup window must close after it opens")]
    InvalidPickupWindow,
    #[error("unknown category `{0}`")]
    UnknownCategory(CategoryId),
    #[error("tier {requested} is below the category default tier {minimum}")]
    TierBelowCategoryDefault { requested: RiskTier, minimum: RiskTier },
    #[error("high-risk listings require an owner's manual link")]
    MissingManualUrl,
    #[error("manual link must start with `{prefix}`")]
    ManualUrlNotAllowed { prefix: String },
    #[error("unknown booking type `{0}`")]
    UnknownBookingType(String),
}

/// Form state for the add/edit listing screens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub brand: String,
    pub category_id: Option<CategoryId>,
    pub tier_override: Option<RiskTier>,
    pub daily_price: Decimal,
    pub images: Vec<String>,
    pub description: String,
    pub booking_type: BookingType,
    pub accepts_barter: bool,
    pub min_rental_days: u32,
    pub location_address: String,
    pub pickup_window: Option<PickupWindow>,
    pub manual_url: Option<String>,
}

impl ListingDraft {
    /// Brand and title joined with a space, or whichever one is present.
    pub fn display_name(&self) -> String {
        let brand = self.brand.trim();
        let title = self.title.trim();
        match (brand.is_empty(), title.is_empty()) {
            (false, false) => format!("{brand} {title}"),
            (false, true) => brand.to_string(),
            (true, false) => title.to_string(),
            (true, true) => String::new(),
        }
    }

    pub fn set_accepts_barter(&mut self, accepts_barter: bool) {
        self.accepts_barter = accepts_barter;
        if accepts_barter {
            self.booking_type = BookingType::Request;
        }
    }

    pub fn set_booking_type(
        &mut self,
        booking_type: BookingType,
    ) -> Result<(), ListingValidationError> {
        if self.accepts_barter && booking_type == BookingType::Instant {
            return Err(ListingValidationError::BarterRequiresRequestBooking);
        }
        self.booking_type = booking_type;
        Ok(())
    }

    /// Changing the category always drops a previously chosen tier upgrade.
    pub fn set_category(&mut self, category_id: Option<CategoryId>) {
        if self.category_id != category_id {
            self.tier_override = None;
        }
        self.category_id = category_id;
    }

    pub fn validate(
        &self,
        category: Option<&Category>,
        policy: &ListingPolicy,
    ) -> Result<(), ListingValidationError> {
        if self.title.trim().is_empty() {
            return Err(ListingValidationError::MissingField("title"));
        }

        let category_id =
            self.category_id.as_ref().ok_or(ListingValidationError::MissingField("category"))?;
        let category = category
            .filter(|category| &category.id == category_id)
            .ok_or_else(|| ListingValidationError::UnknownCategory(category_id.clone()))?;

        if self.daily_price <= Decimal::ZERO {
            return Err(ListingValidationError::InvalidDailyPrice);
        }

        let count = self.images.iter().filter(|image| !image.trim().is_empty()).count();
        if count < policy.min_images || count > policy.max_images {
            return Err(ListingValidationError::ImageCount {
                count,
                min: policy.min_images,
                max: policy.max_images,
            });
        }

        if self.accepts_barter && self.booking_type != BookingType::Request {
            return Err(ListingValidationError::BarterRequiresRequestBooking);
        }

        if self.min_rental_days == 0 {
            return Err(ListingValidationError::InvalidMinRentalDays);
        }

        if self.location_address.trim().is_empty() {
            return Err(ListingValidationError::MissingField("location_address"));
        }

        if let Some(window) = self.pickup_window {
            if window.closes_at <= window.opens_at {
                return Err(ListingValidationError::InvalidPickupWindow);
            }
        }

        validate_tier_override(category, self.tier_override)?;

        if effective_tier(category, self.tier_override) == RiskTier::High {
            let manual_url = self.manual_url.as_deref().map(str::trim).unwrap_or_default();
            if manual_url.is_empty() {
                return Err(ListingValidationError::MissingManualUrl);
            }
            if !manual_url.starts_with(&policy.manual_url_prefix) {
                return Err(ListingValidationError::ManualUrlNotAllowed {
                    prefix: policy.manual_url_prefix.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Partial update for an existing listing. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub category_id: Option<CategoryId>,
    pub tier_override: Option<Option<RiskTier>>,
    pub daily_price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub booking_type: Option<BookingType>,
    pub accepts_barter: Option<bool>,
    pub min_rental_days: Option<u32>,
    pub location_address: Option<String>,
    pub pickup_window: Option<Option<PickupWindow>>,
    pub manual_url: Option<Option<String>>,
}

impl ListingPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(self, draft: &mut ListingDraft) -> Result<(), ListingValidationError> {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(brand) = self.brand {
            draft.brand = brand;
        }
        if let Some(category_id) = self.category_id {
            draft.set_category(Some(category_id));
        }
        if let Some(tier_override) = self.tier_override {
            draft.tier_override = tier_override;
        }
        if let Some(daily_price) = self.daily_price {
            draft.daily_price = daily_price;
        }
        if let Some(images) = self.images {
            draft.images = images;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(accepts_barter) = self.accepts_barter {
            draft.set_accepts_barter(accepts_barter);
        }
        if let Some(booking_type) = self.booking_type {
            draft.set_booking_type(booking_type)?;
        }
        if let Some(min_rental_days) = self.min_rental_days {
            draft.min_rental_days = min_rental_days;
        }
        if let Some(location_address) = self.location_address {
            draft.location_address = location_address;
        }
        if let Some(pickup_window) = self.pickup_window {
            draft.pickup_window = pickup_window;
        }
        if let Some(manual_url) = self.manual_url {
            draft.manual_url = manual_url;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner_id: UserId,
    pub draft: ListingDraft,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn display_name(&self) -> String {
        self.draft.display_name()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use rust_decimal::Decimal;

    use super::{
        BookingType, ListingDraft, ListingPatch, ListingPolicy, ListingValidationError,
        PickupWindow,
    };
    use crate::domain::category::{Category, CategoryId};
    use crate::domain::tier::RiskTier;

    fn category(tier: RiskTier) -> Category {
        Category {
            id: CategoryId("power-tools".to_string()),
            name: "Power Tools".to_string(),
            default_risk_tier: tier,
            default_daily_fee: Decimal::new(400, 2),
            default_deductible: Decimal::new(75, 0),
        }
    }

    fn draft() -> ListingDraft {
        ListingDraft {
            title: "Cordless Drill".to_string(),
            brand: "DeWalt".to_string(),
            category_id: Some(CategoryId("power-tools".to_string())),
            daily_price: Decimal::new(1200, 2),
            images: vec!["front.jpg".to_string(), "side.jpg".to_string()],
            description: "18V with two batteries".to_string(),
            min_rental_days: 1,
            location_address: "12 Elm Street".to_string(),
            ..ListingDraft::default()
        }
    }

    #[test]
    fn display_name_joins_brand_and_title() {
        let mut draft = draft();
        assert_eq!(draft.display_name(), "DeWalt Cordless Drill");

        draft.brand = "  ".to_string();
        assert_eq!(draft.display_name(), "Cordless Drill");

        draft.brand = "Makita".to_string();
        draft.title.clear();
        assert_eq!(draft.display_name(), "Makita");
    }

    #[test]
    fn barter_forces_request_booking() {
        let mut draft = draft();
        draft.booking_type = BookingType::Instant;
        draft.set_accepts_barter(true);
        assert_eq!(draft.booking_type, BookingType::Request);

        let error = draft.set_booking_type(BookingType::Instant).expect_err("instant refused");
        assert_eq!(error, ListingValidationError::BarterRequiresRequestBooking);

        draft.set_accepts_barter(false);
        draft.set_booking_type(BookingType::Instant).expect("instant allowed without barter");
    }

    #[test]
    fn valid_draft_passes() {
        draft()
            .validate(Some(&category(RiskTier::Medium)), &ListingPolicy::default())
            .expect("valid draft");
    }

    #[test]
    fn image_count_must_be_within_bounds() {
        let policy = ListingPolicy::default();
        let category = category(RiskTier::Low);

        let mut too_few = draft();
        too_few.images.truncate(1);
        assert_eq!(
            too_few.validate(Some(&category), &policy),
            Err(ListingValidationError::ImageCount { count: 1, min: 2, max: 5 })
        );

        let mut too_many = draft();
        too_many.images = (0..6).map(|index| format!("{index}.jpg")).collect();
        assert!(matches!(
            too_many.validate(Some(&category), &policy),
            Err(ListingValidationError::ImageCount { count: 6, .. })
        ));
    }

    #[test]
    fn tier_override_cannot_downgrade_category() {
        let mut draft = draft();
        draft.tier_override = Some(RiskTier::Low);
        assert_eq!(
            draft.validate(Some(&category(RiskTier::Medium)), &ListingPolicy::default()),
            Err(ListingValidationError::TierBelowCategoryDefault {
                requested: RiskTier::Low,
                minimum: RiskTier::Medium,
            })
        );
    }

    #[test]
    fn high_risk_listing_needs_allowed_manual_url() {
        let policy = ListingPolicy::default();
        let category = category(RiskTier::Medium);
        let mut draft = draft();
        draft.tier_override = Some(RiskTier::High);

        assert_eq!(
            draft.validate(Some(&category), &policy),
            Err(ListingValidationError::MissingManualUrl)
        );

        draft.manual_url = Some("https://example.com/drill.pdf".to_string());
        assert!(matches!(
            draft.validate(Some(&category), &policy),
            Err(ListingValidationError::ManualUrlNotAllowed { .. })
        ));

        draft.manual_url = Some(format!("{}dewalt/drill", policy.manual_url_prefix));
        draft.validate(Some(&category), &policy).expect("manual url accepted");
    }

    #[test]
    fn draft_requires_matching_category() {
        let mut draft = draft();
        draft.category_id = None;
        assert_eq!(
            draft.validate(None, &ListingPolicy::default()),
            Err(ListingValidationError::MissingField("category"))
        );

        draft.category_id = Some(CategoryId("garden".to_string()));
        assert!(matches!(
            draft.validate(Some(&category(RiskTier::Low)), &ListingPolicy::default()),
            Err(ListingValidationError::UnknownCategory(_))
        ));
    }

    #[test]
    fn pickup_window_must_be_ordered() {
        let mut draft = draft();
        draft.pickup_window = Some(PickupWindow {
            opens_at: NaiveTime::from_hms_opt(18, 0, 0).expect("time"),
            closes_at: NaiveTime::from_hms_opt(9, 0, 0).expect("time"),
        });
        assert_eq!(
            draft.validate(Some(&category(RiskTier::Low)), &ListingPolicy::default()),
            Err(ListingValidationError::InvalidPickupWindow)
        );
    }

    #[test]
    fn patch_category_change_resets_override() {
        let mut draft = draft();
        draft.tier_override = Some(RiskTier::High);

        ListingPatch {
            category_id: Some(CategoryId("garden".to_string())),
            ..ListingPatch::default()
        }
        .apply(&mut draft)
        .expect("patch applies");

        assert_eq!(draft.tier_override, None);
        assert_eq!(draft.category_id, Some(CategoryId("garden".to_string())));
    }

    #[test]
    fn patch_enabling_barter_and_instant_together_is_rejected() {
        let mut draft = draft();
        let error = ListingPatch {
            accepts_barter: Some(true),
            booking_type: Some(BookingType::Instant),
            ..ListingPatch::default()
        }
        .apply(&mut draft)
        .expect_err("conflicting patch");

        assert_eq!(error, ListingValidationError::BarterRequiresRequestBooking);
    }
}
