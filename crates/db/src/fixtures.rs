use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Category ids and default tiers the reference seed must produce.
const SEED_CATEGORIES: &[SeedCategoryContract] = &[
    SeedCategoryContract { id: "hand-tools", default_risk_tier: 1 },
    SeedCategoryContract { id: "garden-tools", default_risk_tier: 1 },
    SeedCategoryContract { id: "camping", default_risk_tier: 1 },
    SeedCategoryContract { id: "cleaning", default_risk_tier: 1 },
    SeedCategoryContract { id: "power-tools", default_risk_tier: 2 },
    SeedCategoryContract { id: "ladders", default_risk_tier: 2 },
    SeedCategoryContract { id: "lawn-equipment", default_risk_tier: 2 },
    SeedCategoryContract { id: "pressure-washers", default_risk_tier: 2 },
    SeedCategoryContract { id: "heavy-equipment", default_risk_tier: 3 },
];

const SEED_SERVICE_FEE_PCT: &str = "10.00";
const SEED_MAX_RENTAL_DAYS: i64 = 30;

/// Static reference data: the category catalog and the platform settings row.
///
/// Loading is idempotent; rows that already exist are left as they are, so a
/// re-seed never clobbers an operator's edits.
pub struct ReferenceSeedDataset;

impl ReferenceSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/reference_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            categories_seeded: SEED_CATEGORIES.iter().map(|category| category.id).collect(),
            settings_seeded: true,
        })
    }

    /// Checks every contract category (id and tier) plus the settings row.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for category in SEED_CATEGORIES {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM category WHERE id = ?1 AND default_risk_tier = ?2)",
            )
            .bind(category.id)
            .bind(category.default_risk_tier)
            .fetch_one(pool)
            .await?;
            checks.push((category.id, present == 1));
        }

        let settings: Option<(String, i64)> = sqlx::query_as(
            "SELECT service_fee_pct, max_rental_days FROM platform_settings WHERE id = 1",
        )
        .fetch_optional(pool)
        .await?;
        checks.push((
            "platform-settings",
            settings.is_some_and(|(fee, max_days)| {
                fee == SEED_SERVICE_FEE_PCT && max_days == SEED_MAX_RENTAL_DAYS
            }),
        ));

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedCategoryContract {
    id: &'static str,
    default_risk_tier: i64,
}

#[derive(Debug)]
pub struct SeedResult {
    pub categories_seeded: Vec<&'static str>,
    pub settings_seeded: bool,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_mentions_every_contract_category() {
        for category in SEED_CATEGORIES {
            assert!(
                ReferenceSeedDataset::SQL.contains(&format!("'{}'", category.id)),
                "seed SQL should include {}",
                category.id
            );
        }
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = ReferenceSeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification =
            ReferenceSeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.categories_seeded.len(), 9);

        let second = ReferenceSeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            ReferenceSeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.categories_seeded, first.categories_seeded);
        assert_eq!(first_verification.checks, second_verification.checks);

        let category_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM category")
            .fetch_one(&pool)
            .await
            .expect("count categories");
        assert_eq!(category_count, 9);
    }

    #[tokio::test]
    async fn reseed_keeps_operator_edits() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        ReferenceSeedDataset::load(&pool).await.expect("seed");

        sqlx::query("UPDATE platform_settings SET max_rental_days = 14 WHERE id = 1")
            .execute(&pool)
            .await
            .expect("edit settings");
        ReferenceSeedDataset::load(&pool).await.expect("reseed");

        let max_days: i64 =
            sqlx::query_scalar("SELECT max_rental_days FROM platform_settings WHERE id = 1")
                .fetch_one(&pool)
                .await
                .expect("read settings");
        assert_eq!(max_days, 14);

        let verification = ReferenceSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert!(verification.checks.contains(&("platform-settings", false)));
    }

    #[test]
    fn seed_contract_json_matches_rust_seed_constants() {
        let contract: serde_json::Value = serde_json::from_str(include_str!(
            "../../../config/fixtures/reference_seed_contract.json"
        ))
        .expect("reference seed contract JSON must parse");

        assert_eq!(contract["dataset_version"].as_str(), Some("reference-v1"));
        assert_eq!(contract["seed_dataset"].as_str(), Some("deterministic_reference_data"));

        let categories = contract["categories"].as_array().expect("categories should be an array");
        assert_eq!(categories.len(), SEED_CATEGORIES.len());
        for (contract_category, category) in categories.iter().zip(SEED_CATEGORIES) {
            assert_eq!(contract_category["id"].as_str(), Some(category.id));
            assert_eq!(
                contract_category["default_risk_tier"].as_i64(),
                Some(category.default_risk_tier)
            );
        }

        assert_eq!(
            contract["platform_settings"]["service_fee_pct"].as_str(),
            Some(SEED_SERVICE_FEE_PCT)
        );
        assert_eq!(
            contract["platform_settings"]["max_rental_days"].as_i64(),
            Some(SEED_MAX_RENTAL_DAYS)
        );
    }
}
