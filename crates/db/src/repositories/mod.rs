use async_trait::async_trait;
use thiserror::Error;

use toolshare_core::availability::RawInterval;
use toolshare_core::domain::block::OwnerBlock;
use toolshare_core::domain::category::Category;
use toolshare_core::domain::listing::{Listing, ListingId, UserId};
use toolshare_core::domain::rental::{RentalId, RentalRequest};
use toolshare_core::domain::settings::PlatformSettings;
use toolshare_core::errors::ApplicationError;
use toolshare_core::suggestions::CategoryKeywords;

pub mod availability;
pub mod category;
pub mod listing;
pub mod memory;
pub mod messenger;
pub mod rental;

pub use availability::SqlAvailabilityRepository;
pub use category::SqlCategoryRepository;
pub use listing::SqlListingRepository;
pub use memory::{
    InMemoryAvailabilityRepository, InMemoryCategoryRepository, InMemoryListingRepository,
    InMemoryRentalRepository,
};
pub use messenger::{InMemorySystemMessenger, SentMessage, SqlSystemMessenger};
pub use rental::SqlRentalRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(message) => Self::NotFound(message),
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// Categories plus the platform settings row; both are seeded, never edited in-app.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Category>, RepositoryError>;
    async fn list_with_keywords(&self) -> Result<Vec<CategoryKeywords>, RepositoryError>;
    async fn save(&self, entry: CategoryKeywords) -> Result<(), RepositoryError>;
    async fn platform_settings(&self) -> Result<Option<PlatformSettings>, RepositoryError>;
    async fn save_platform_settings(
        &self,
        settings: PlatformSettings,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn create(&self, listing: Listing) -> Result<(), RepositoryError>;
    async fn update(&self, listing: Listing) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
}

#[async_trait]
pub trait RentalRepository: Send + Sync {
    async fn find_by_id(&self, id: &RentalId) -> Result<Option<RentalRequest>, RepositoryError>;
    async fn save(&self, rental: RentalRequest) -> Result<(), RepositoryError>;
    async fn list_for_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Vec<RentalRequest>, RepositoryError>;
    async fn list_pending_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<RentalRequest>, RepositoryError>;
}

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Live rentals and owner blocks, unnormalized.
    async fn list_blocked_intervals_for_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Vec<RawInterval>, RepositoryError>;
    async fn add_owner_block(&self, block: OwnerBlock) -> Result<(), RepositoryError>;
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
