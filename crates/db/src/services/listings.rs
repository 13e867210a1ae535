use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use toolshare_core::catalog::{ReferenceDataCache, ReferenceDataSource};
use toolshare_core::domain::category::Category;
use toolshare_core::domain::listing::{
    Listing, ListingDraft, ListingId, ListingPatch, ListingPolicy, UserId,
};
use toolshare_core::errors::{ApplicationError, DomainError};
use toolshare_core::pricing::{compute_financials, quote_rental, RentalQuote, RentalQuoteInput};

use crate::repositories::ListingRepository;

/// Owner-facing listing operations. Every write is validated against the cached
/// category catalog first, including the upgrade-only tier rule.
pub struct ListingService {
    listings: Arc<dyn ListingRepository>,
    reference: Arc<dyn ReferenceDataSource>,
    cache: Arc<ReferenceDataCache>,
    policy: ListingPolicy,
}

impl ListingService {
    pub fn new(
        listings: Arc<dyn ListingRepository>,
        reference: Arc<dyn ReferenceDataSource>,
        cache: Arc<ReferenceDataCache>,
        policy: ListingPolicy,
    ) -> Self {
        Self { listings, reference, cache, policy }
    }

    async fn category_for(
        &self,
        draft: &ListingDraft,
    ) -> Result<Option<Category>, ApplicationError> {
        match &draft.category_id {
            Some(id) => self.cache.category(self.reference.as_ref(), id).await,
            None => Ok(None),
        }
    }

    pub async fn create_listing(
        &self,
        owner_id: UserId,
        draft: ListingDraft,
    ) -> Result<Listing, ApplicationError> {
        let category = self.category_for(&draft).await?;
        draft.validate(category.as_ref(), &self.policy)?;

        let now = Utc::now();
        let listing = Listing {
            id: ListingId(Uuid::new_v4().to_string()),
            owner_id,
            draft,
            created_at: now,
            updated_at: now,
        };
        self.listings.create(listing.clone()).await?;

        let financials = compute_financials(category.as_ref(), listing.draft.tier_override);
        info!(
            event_name = "listing.created",
            listing_id = %listing.id,
            owner_id = %listing.owner_id,
            tier = financials.current_tier.as_u8(),
            "listing created"
        );
        Ok(listing)
    }

    /// Applies a partial edit. Only the owner may edit, and the merged draft must pass
    /// the same validation as a new listing.
    pub async fn update_listing(
        &self,
        id: &ListingId,
        editor: &UserId,
        patch: ListingPatch,
    ) -> Result<Listing, ApplicationError> {
        let mut listing = self.get_listing(id).await?;
        if &listing.owner_id != editor {
            return Err(DomainError::NotPermitted(format!(
                "user `{editor}` does not own listing `{id}`"
            ))
            .into());
        }
        if patch.is_empty() {
            return Ok(listing);
        }

        patch.apply(&mut listing.draft)?;
        let category = self.category_for(&listing.draft).await?;
        listing.draft.validate(category.as_ref(), &self.policy)?;
        listing.updated_at = Utc::now();

        self.listings.update(listing.clone()).await?;
        info!(event_name = "listing.updated", listing_id = %listing.id, "listing updated");
        Ok(listing)
    }

    pub async fn get_listing(&self, id: &ListingId) -> Result<Listing, ApplicationError> {
        self.listings
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("listing `{id}`")))
    }

    /// Renter-facing price for `days` days of this listing.
    pub async fn quote(&self, id: &ListingId, days: u32) -> Result<RentalQuote, ApplicationError> {
        let listing = self.get_listing(id).await?;
        let category = self.category_for(&listing.draft).await?;
        let settings = self.cache.platform_settings(self.reference.as_ref()).await?;

        let quote = quote_rental(RentalQuoteInput {
            daily_price: listing.draft.daily_price,
            days,
            financials: compute_financials(category.as_ref(), listing.draft.tier_override),
            settings: &settings,
        })?;
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use toolshare_core::catalog::ReferenceDataCache;
    use toolshare_core::domain::category::{Category, CategoryId};
    use toolshare_core::domain::listing::{
        ListingDraft, ListingId, ListingPatch, ListingPolicy, ListingValidationError, UserId,
    };
    use toolshare_core::domain::settings::PlatformSettings;
    use toolshare_core::domain::tier::RiskTier;
    use toolshare_core::errors::{ApplicationError, DomainError};
    use toolshare_core::suggestions::CategoryKeywords;

    use super::ListingService;
    use crate::repositories::{InMemoryCategoryRepository, InMemoryListingRepository};

    fn category(id: &str, tier: RiskTier) -> CategoryKeywords {
        CategoryKeywords {
            category: Category {
                id: CategoryId(id.to_string()),
                name: id.to_string(),
                default_risk_tier: tier,
                default_daily_fee: Decimal::new(400, 2),
                default_deductible: Decimal::new(75, 0),
            },
            keywords: Vec::new(),
        }
    }

    fn service() -> ListingService {
        let reference = Arc::new(InMemoryCategoryRepository::with_data(
            vec![category("power-tools", RiskTier::Medium), category("camping", RiskTier::Low)],
            Some(PlatformSettings::default()),
        ));
        ListingService::new(
            Arc::new(InMemoryListingRepository::default()),
            reference,
            Arc::new(ReferenceDataCache::new()),
            ListingPolicy::default(),
        )
    }

    fn draft() -> ListingDraft {
        ListingDraft {
            title: "Cordless drill".to_string(),
            brand: "Makita".to_string(),
            category_id: Some(CategoryId("power-tools".to_string())),
            daily_price: Decimal::new(1000, 2),
            images: vec!["front.jpg".to_string(), "side.jpg".to_string()],
            min_rental_days: 1,
            location_address: "12 Elm St".to_string(),
            ..ListingDraft::default()
        }
    }

    fn owner() -> UserId {
        UserId("owner-1".to_string())
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let service = service();
        let created = service.create_listing(owner(), draft()).await.expect("create");
        let fetched = service.get_listing(&created.id).await.expect("get");

        assert_eq!(fetched, created);
        assert_eq!(fetched.display_name(), "Makita Cordless drill");
    }

    #[tokio::test]
    async fn tier_downgrade_is_rejected_before_writing() {
        let service = service();
        let mut draft = draft();
        draft.tier_override = Some(RiskTier::Low);

        let error = service.create_listing(owner(), draft).await.expect_err("downgrade");
        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::ListingValidation(
                ListingValidationError::TierBelowCategoryDefault { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn upgrade_to_high_tier_requires_manual_link() {
        let service = service();
        let created = service.create_listing(owner(), draft()).await.expect("create");

        let error = service
            .update_listing(
                &created.id,
                &owner(),
                ListingPatch {
                    tier_override: Some(Some(RiskTier::High)),
                    ..ListingPatch::default()
                },
            )
            .await
            .expect_err("manual link missing");
        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::ListingValidation(
                ListingValidationError::MissingManualUrl
            ))
        ));

        let updated = service
            .update_listing(
                &created.id,
                &owner(),
                ListingPatch {
                    tier_override: Some(Some(RiskTier::High)),
                    manual_url: Some(Some("https://www.manualslib.com/drill.html".to_string())),
                    ..ListingPatch::default()
                },
            )
            .await
            .expect("update with manual");
        assert_eq!(updated.draft.tier_override, Some(RiskTier::High));
    }

    #[tokio::test]
    async fn category_change_drops_the_override() {
        let service = service();
        let mut draft = draft();
        draft.tier_override = Some(RiskTier::Medium);
        let created = service.create_listing(owner(), draft).await.expect("create");

        let updated = service
            .update_listing(
                &created.id,
                &owner(),
                ListingPatch {
                    category_id: Some(CategoryId("camping".to_string())),
                    ..ListingPatch::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.draft.tier_override, None);
    }

    #[tokio::test]
    async fn only_the_owner_may_edit() {
        let service = service();
        let created = service.create_listing(owner(), draft()).await.expect("create");

        let error = service
            .update_listing(
                &created.id,
                &UserId("someone-else".to_string()),
                ListingPatch { title: Some("Mine now".to_string()), ..ListingPatch::default() },
            )
            .await
            .expect_err("not the owner");
        assert!(matches!(error, ApplicationError::Domain(DomainError::NotPermitted(_))));

        let missing = service
            .get_listing(&ListingId("nope".to_string()))
            .await
            .expect_err("missing listing");
        assert!(matches!(missing, ApplicationError::NotFound(_)));
    }

    #[tokio::test]
    async fn quote_uses_tier_fee_and_service_fee() {
        let service = service();
        let created = service.create_listing(owner(), draft()).await.expect("create");

        let quote = service.quote(&created.id, 3).await.expect("quote");

        assert_eq!(quote.rental_subtotal, Decimal::new(3000, 2));
        assert_eq!(quote.peace_fund_total, Decimal::new(1200, 2));
        assert_eq!(quote.service_fee, Decimal::new(300, 2));
        assert_eq!(quote.total, Decimal::new(4500, 2));
    }
}
