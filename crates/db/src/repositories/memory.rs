use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use toolshare_core::availability::RawInterval;
use toolshare_core::catalog::ReferenceDataSource;
use toolshare_core::domain::block::OwnerBlock;
use toolshare_core::domain::category::Category;
use toolshare_core::domain::listing::{Listing, ListingId, UserId};
use toolshare_core::domain::rental::{RentalId, RentalRequest, RentalStatus};
use toolshare_core::domain::settings::PlatformSettings;
use toolshare_core::errors::ApplicationError;
use toolshare_core::suggestions::{
    best_keyword_match, CategoryKeywords, CategorySuggester, SuggestionError,
};

use super::{
    AvailabilityRepository, CategoryRepository, ListingRepository, RentalRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    entries: RwLock<Vec<CategoryKeywords>>,
    settings: RwLock<Option<PlatformSettings>>,
}

impl InMemoryCategoryRepository {
    pub fn with_data(entries: Vec<CategoryKeywords>, settings: Option<PlatformSettings>) -> Self {
        Self { entries: RwLock::new(entries), settings: RwLock::new(settings) }
    }
}

#[async_trait::async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().map(|entry| entry.category.clone()).collect())
    }

    async fn list_with_keywords(&self) -> Result<Vec<CategoryKeywords>, RepositoryError> {
        Ok(self.entries.read().await.clone())
    }

    async fn save(&self, entry: CategoryKeywords) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|existing| existing.category.id == entry.category.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    async fn platform_settings(&self) -> Result<Option<PlatformSettings>, RepositoryError> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_platform_settings(
        &self,
        settings: PlatformSettings,
    ) -> Result<(), RepositoryError> {
        *self.settings.write().await = Some(settings);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReferenceDataSource for InMemoryCategoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, ApplicationError> {
        Ok(CategoryRepository::list(self).await?)
    }

    async fn platform_settings(&self) -> Result<PlatformSettings, ApplicationError> {
        CategoryRepository::platform_settings(self).await?.ok_or_else(|| {
            ApplicationError::NotFound("platform settings have not been seeded".to_string())
        })
    }
}

#[async_trait::async_trait]
impl CategorySuggester for InMemoryCategoryRepository {
    async fn suggest_category(&self, title: &str) -> Result<Option<Category>, SuggestionError> {
        let entries = self.entries.read().await;
        Ok(best_keyword_match(title, &entries).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: RwLock<HashMap<String, Listing>>,
}

#[async_trait::async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn create(&self, listing: Listing) -> Result<(), RepositoryError> {
        let mut listings = self.listings.write().await;
        if listings.contains_key(&listing.id.0) {
            return Err(RepositoryError::Conflict(format!("listing `{}`", listing.id)));
        }
        listings.insert(listing.id.0.clone(), listing);
        Ok(())
    }

    async fn update(&self, listing: Listing) -> Result<(), RepositoryError> {
        let mut listings = self.listings.write().await;
        match listings.get_mut(&listing.id.0) {
            Some(existing) => {
                *existing = listing;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("listing `{}`", listing.id))),
        }
    }

    async fn find_by_id(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let listings = self.listings.read().await;
        Ok(listings.get(&id.0).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryRentalRepository {
    rentals: RwLock<HashMap<String, RentalRequest>>,
}

#[async_trait::async_trait]
impl RentalRepository for InMemoryRentalRepository {
    async fn find_by_id(&self, id: &RentalId) -> Result<Option<RentalRequest>, RepositoryError> {
        let rentals = self.rentals.read().await;
        Ok(rentals.get(&id.0).cloned())
    }

    async fn save(&self, rental: RentalRequest) -> Result<(), RepositoryError> {
        let mut rentals = self.rentals.write().await;
        rentals.insert(rental.id.0.clone(), rental);
        Ok(())
    }

    async fn list_for_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Vec<RentalRequest>, RepositoryError> {
        let rentals = self.rentals.read().await;
        let mut matching: Vec<RentalRequest> =
            rentals.values().filter(|rental| &rental.listing_id == listing_id).cloned().collect();
        matching.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(matching)
    }

    async fn list_pending_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<RentalRequest>, RepositoryError> {
        let rentals = self.rentals.read().await;
        let mut matching: Vec<RentalRequest> = rentals
            .values()
            .filter(|rental| &rental.owner_id == owner_id)
            .filter(|rental| {
                rental.status == RentalStatus::Pending || rental.pending_extension.is_some()
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(matching)
    }
}

/// Reads rentals from a shared rental store so both views stay consistent.
pub struct InMemoryAvailabilityRepository {
    rentals: Arc<InMemoryRentalRepository>,
    blocks: RwLock<Vec<OwnerBlock>>,
}

impl InMemoryAvailabilityRepository {
    pub fn new(rentals: Arc<InMemoryRentalRepository>) -> Self {
        Self { rentals, blocks: RwLock::new(Vec::new()) }
    }
}

#[async_trait::async_trait]
impl AvailabilityRepository for InMemoryAvailabilityRepository {
    async fn list_blocked_intervals_for_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Vec<RawInterval>, RepositoryError> {
        let rentals = self.rentals.rentals.read().await;
        let mut intervals: Vec<RawInterval> = rentals
            .values()
            .filter(|rental| &rental.listing_id == listing_id && rental.status.blocks_calendar())
            .map(|rental| {
                RawInterval::new(rental.start_date.to_string(), rental.end_date.to_string())
            })
            .collect();

        let blocks = self.blocks.read().await;
        intervals.extend(
            blocks
                .iter()
                .filter(|block| &block.listing_id == listing_id)
                .map(OwnerBlock::raw_interval),
        );
        Ok(intervals)
    }

    async fn add_owner_block(&self, block: OwnerBlock) -> Result<(), RepositoryError> {
        self.blocks.write().await.push(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use toolshare_core::availability::{BookedInterval, UnavailableDateSet};
    use toolshare_core::catalog::ReferenceDataSource;
    use toolshare_core::domain::block::{OwnerBlock, OwnerBlockId};
    use toolshare_core::domain::category::{Category, CategoryId};
    use toolshare_core::domain::listing::{Listing, ListingDraft, ListingId, UserId};
    use toolshare_core::domain::rental::{RentalId, RentalRequest, RentalStatus};
    use toolshare_core::domain::tier::RiskTier;
    use toolshare_core::errors::ApplicationError;
    use toolshare_core::suggestions::{CategoryKeywords, CategorySuggester};

    use crate::repositories::{
        AvailabilityRepository, CategoryRepository, InMemoryAvailabilityRepository,
        InMemoryCategoryRepository, InMemoryListingRepository, InMemoryRentalRepository,
        ListingRepository, RentalRepository, RepositoryError,
    };

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).expect("valid date")
    }

    fn rental(id: &str, start: u32, end: u32, status: RentalStatus) -> RentalRequest {
        RentalRequest {
            id: RentalId(id.to_string()),
            listing_id: ListingId("L-1".to_string()),
            owner_id: UserId("owner".to_string()),
            renter_id: UserId("renter".to_string()),
            chat_id: None,
            start_date: date(start),
            end_date: date(end),
            status,
            pending_extension: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn category_repo_serves_reference_data_and_suggestions() {
        let repo = InMemoryCategoryRepository::default();
        let error = ReferenceDataSource::platform_settings(&repo)
            .await
            .expect_err("settings are missing");
        assert!(matches!(error, ApplicationError::NotFound(_)));

        repo.save(CategoryKeywords {
            category: Category {
                id: CategoryId("camping".to_string()),
                name: "Camping Gear".to_string(),
                default_risk_tier: RiskTier::Low,
                default_daily_fee: Decimal::new(150, 2),
                default_deductible: Decimal::new(25, 0),
            },
            keywords: vec!["tent".to_string()],
        })
        .await
        .expect("save category");

        let categories = repo.list_categories().await.expect("categories");
        let suggestion = repo.suggest_category("4 person tent").await.expect("suggestion");

        assert_eq!(categories.len(), 1);
        assert_eq!(suggestion.map(|category| category.id.0), Some("camping".to_string()));
    }

    #[tokio::test]
    async fn listing_repo_enforces_create_and_update_semantics() {
        let repo = InMemoryListingRepository::default();
        let listing = Listing {
            id: ListingId("L-1".to_string()),
            owner_id: UserId("owner".to_string()),
            draft: ListingDraft { title: "Tent".to_string(), ..ListingDraft::default() },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let missing = repo.update(listing.clone()).await.expect_err("not created yet");
        assert!(matches!(missing, RepositoryError::NotFound(_)));

        repo.create(listing.clone()).await.expect("create");
        let duplicate = repo.create(listing.clone()).await.expect_err("duplicate");
        assert!(matches!(duplicate, RepositoryError::Conflict(_)));

        let found = repo.find_by_id(&listing.id).await.expect("find");
        assert_eq!(found, Some(listing));
    }

    #[tokio::test]
    async fn availability_combines_live_rentals_and_blocks() {
        let rentals = Arc::new(InMemoryRentalRepository::default());
        let availability = InMemoryAvailabilityRepository::new(Arc::clone(&rentals));

        rentals.save(rental("R-1", 4, 6, RentalStatus::Pending)).await.expect("pending");
        rentals.save(rental("R-2", 10, 11, RentalStatus::Cancelled)).await.expect("cancelled");
        availability
            .add_owner_block(OwnerBlock {
                id: OwnerBlockId("B-1".to_string()),
                listing_id: ListingId("L-1".to_string()),
                interval: BookedInterval { start: date(20), end: date(21) },
                reason: None,
                created_at: Utc::now(),
            })
            .await
            .expect("block");

        let raw = availability
            .list_blocked_intervals_for_listing(&ListingId("L-1".to_string()))
            .await
            .expect("intervals");
        let blocked = UnavailableDateSet::from_raw(&raw);

        assert_eq!(blocked.len(), 5);
        assert!(!blocked.is_blocked(date(10)));

        let pending = rentals
            .list_pending_for_owner(&UserId("owner".to_string()))
            .await
            .expect("pending");
        assert_eq!(pending.len(), 1);
    }
}
