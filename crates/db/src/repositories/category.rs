use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;
use tracing::warn;

use toolshare_core::catalog::ReferenceDataSource;
use toolshare_core::domain::category::{Category, CategoryId};
use toolshare_core::domain::settings::PlatformSettings;
use toolshare_core::domain::tier::RiskTier;
use toolshare_core::errors::ApplicationError;
use toolshare_core::suggestions::{
    best_keyword_match, CategoryKeywords, CategorySuggester, SuggestionError,
};

use super::{decode_error, CategoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCategoryRepository {
    pool: DbPool,
}

impl SqlCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CategoryKeywords, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let tier: i64 = row.try_get("default_risk_tier").map_err(decode_error)?;
    let daily_fee: String = row.try_get("default_daily_fee").map_err(decode_error)?;
    let deductible: String = row.try_get("default_deductible").map_err(decode_error)?;
    let keywords_json: String = row.try_get("keywords_json").map_err(decode_error)?;

    let keywords: Vec<String> = serde_json::from_str(&keywords_json).map_err(decode_error)?;

    Ok(CategoryKeywords {
        category: Category {
            id: CategoryId(id),
            name,
            default_risk_tier: RiskTier::try_from(tier).map_err(decode_error)?,
            default_daily_fee: parse_decimal("default_daily_fee", &daily_fee)?,
            default_deductible: parse_decimal("default_deductible", &deductible)?,
        },
        keywords,
    })
}

#[async_trait]
impl CategoryRepository for SqlCategoryRepository {
    async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let entries = self.list_with_keywords().await?;
        Ok(entries.into_iter().map(|entry| entry.category).collect())
    }

    async fn list_with_keywords(&self) -> Result<Vec<CategoryKeywords>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, default_risk_tier, default_daily_fee, default_deductible,
                    keywords_json
             FROM category ORDER BY sort_order ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn save(&self, entry: CategoryKeywords) -> Result<(), RepositoryError> {
        let keywords_json = serde_json::to_string(&entry.keywords).map_err(decode_error)?;
        let category = entry.category;

        sqlx::query(
            "INSERT INTO category (id, name, default_risk_tier, default_daily_fee,
                                   default_deductible, keywords_json, sort_order)
             VALUES (?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(sort_order), 0) + 10 FROM category))
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 default_risk_tier = excluded.default_risk_tier,
                 default_daily_fee = excluded.default_daily_fee,
                 default_deductible = excluded.default_deductible,
                 keywords_json = excluded.keywords_json",
        )
        .bind(&category.id.0)
        .bind(&category.name)
        .bind(i64::from(category.default_risk_tier.as_u8()))
        .bind(category.default_daily_fee.to_string())
        .bind(category.default_deductible.to_string())
        .bind(keywords_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn platform_settings(&self) -> Result<Option<PlatformSettings>, RepositoryError> {
        let row = sqlx::query(
            "SELECT service_fee_pct, max_rental_days FROM platform_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let service_fee_pct: String = row.try_get("service_fee_pct").map_err(decode_error)?;
        let max_rental_days: i64 = row.try_get("max_rental_days").map_err(decode_error)?;

        Ok(Some(PlatformSettings {
            service_fee_pct: parse_decimal("service_fee_pct", &service_fee_pct)?,
            max_rental_days: u32::try_from(max_rental_days).map_err(decode_error)?,
        }))
    }

    async fn save_platform_settings(
        &self,
        settings: PlatformSettings,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO platform_settings (id, service_fee_pct, max_rental_days)
             VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 service_fee_pct = excluded.service_fee_pct,
                 max_rental_days = excluded.max_rental_days",
        )
        .bind(settings.service_fee_pct.to_string())
        .bind(i64::from(settings.max_rental_days))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ReferenceDataSource for SqlCategoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, ApplicationError> {
        Ok(CategoryRepository::list(self).await?)
    }

    async fn platform_settings(&self) -> Result<PlatformSettings, ApplicationError> {
        CategoryRepository::platform_settings(self).await?.ok_or_else(|| {
            ApplicationError::NotFound("platform settings have not been seeded".to_string())
        })
    }
}

#[async_trait]
impl CategorySuggester for SqlCategoryRepository {
    async fn suggest_category(&self, title: &str) -> Result<Option<Category>, SuggestionError> {
        let entries = self.list_with_keywords().await.map_err(|error| {
            warn!(
                event_name = "suggestion.catalog_unavailable",
                error = %error,
                "category keywords could not be loaded"
            );
            SuggestionError::Backend(error.to_string())
        })?;

        Ok(best_keyword_match(title, &entries).cloned())
    }
}
