pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod services;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{ReferenceSeedDataset, SeedResult, VerificationResult};
pub use services::{ListingService, RentalService};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{connect_with_settings, fixtures::ReferenceSeedDataset, migrations, DbPool};

    /// Single-connection in-memory database with migrations and reference data applied.
    pub async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        ReferenceSeedDataset::load(&pool).await.expect("seed reference data");
        pool
    }

    /// Bare listing row so rentals and blocks satisfy their foreign keys.
    pub async fn seed_listing(pool: &DbPool, id: &str, owner_id: &str) {
        sqlx::query(
            "INSERT INTO listing (id, owner_id, title, category_id, daily_price, booking_type,
                                  created_at, updated_at)
             VALUES (?, ?, 'Test listing', 'hand-tools', '5.00', 'request',
                     '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z')",
        )
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await
        .expect("seed listing");
    }
}
