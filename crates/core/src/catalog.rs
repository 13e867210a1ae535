use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::category::{Category, CategoryId};
use crate::domain::settings::PlatformSettings;
use crate::errors::ApplicationError;

/// Backend reads for the two static reference datasets.
#[async_trait]
pub trait ReferenceDataSource: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, ApplicationError>;
    async fn platform_settings(&self) -> Result<PlatformSettings, ApplicationError>;
}

/// Read-through cache for categories and platform settings.
///
/// Each dataset is fetched on first use and then kept for the life of the cache; there
/// is no expiry. A failed fetch leaves the slot empty so the next read tries again.
#[derive(Debug, Default)]
pub struct ReferenceDataCache {
    categories: RwLock<Option<Arc<Vec<Category>>>>,
    settings: RwLock<Option<Arc<PlatformSettings>>>,
}

impl ReferenceDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn categories<S>(&self, source: &S) -> Result<Arc<Vec<Category>>, ApplicationError>
    where
        S: ReferenceDataSource + ?Sized,
    {
        if let Some(categories) = self.categories.read().await.as_ref() {
            return Ok(Arc::clone(categories));
        }

        let mut slot = self.categories.write().await;
        if let Some(categories) = slot.as_ref() {
            return Ok(Arc::clone(categories));
        }

        let categories = Arc::new(source.list_categories().await?);
        info!(
            event_name = "catalog.categories_cached",
            count = categories.len(),
            "category list cached"
        );
        *slot = Some(Arc::clone(&categories));
        Ok(categories)
    }

    pub async fn category<S>(
        &self,
        source: &S,
        id: &CategoryId,
    ) -> Result<Option<Category>, ApplicationError>
    where
        S: ReferenceDataSource + ?Sized,
    {
        let categories = self.categories(source).await?;
        Ok(Category::find(&categories, id).cloned())
    }

    pub async fn platform_settings<S>(
        &self,
        source: &S,
    ) -> Result<Arc<PlatformSettings>, ApplicationError>
    where
        S: ReferenceDataSource + ?Sized,
    {
        if let Some(settings) = self.settings.read().await.as_ref() {
            return Ok(Arc::clone(settings));
        }

        let mut slot = self.settings.write().await;
        if let Some(settings) = slot.as_ref() {
            return Ok(Arc::clone(settings));
        }

        let settings = Arc::new(source.platform_settings().await?);
        info!(event_name = "catalog.settings_cached", "platform settings cached");
        *slot = Some(Arc::clone(&settings));
        Ok(settings)
    }

    pub async fn is_populated(&self) -> bool {
        self.categories.read().await.is_some() && self.settings.read().await.is_some()
    }

    /// Empties both slots.
    pub async fn reset(&self) {
        *self.categories.write().await = None;
        *self.settings.write().await = None;
    }
}
