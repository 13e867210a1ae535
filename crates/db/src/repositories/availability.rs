use async_trait::async_trait;
use sqlx::Row;

use toolshare_core::availability::RawInterval;
use toolshare_core::domain::block::OwnerBlock;
use toolshare_core::domain::listing::ListingId;

use super::listing::format_timestamp;
use super::{decode_error, AvailabilityRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAvailabilityRepository {
    pool: DbPool,
}

impl SqlAvailabilityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityRepository for SqlAvailabilityRepository {
    async fn list_blocked_intervals_for_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Vec<RawInterval>, RepositoryError> {
        // Statuses here must match `RentalStatus::blocks_calendar`.
        let rows = sqlx::query(
            "SELECT start_date, end_date FROM rental
             WHERE listing_id = ?1 AND status IN ('pending', 'approved', 'active')
             UNION ALL
             SELECT start_date, end_date FROM owner_block
             WHERE listing_id = ?1",
        )
        .bind(&listing_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RawInterval {
                    start: row.try_get("start_date").map_err(decode_error)?,
                    end: row.try_get("end_date").map_err(decode_error)?,
                })
            })
            .collect()
    }

    async fn add_owner_block(&self, block: OwnerBlock) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO owner_block (id, listing_id, start_date, end_date, reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&block.id.0)
        .bind(&block.listing_id.0)
        .bind(block.interval.start.to_string())
        .bind(block.interval.end.to_string())
        .bind(block.reason.as_deref())
        .bind(format_timestamp(&block.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
