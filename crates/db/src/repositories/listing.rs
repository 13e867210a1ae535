use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use sqlx::Row;

use toolshare_core::domain::category::CategoryId;
use toolshare_core::domain::listing::{
    BookingType, Listing, ListingDraft, ListingId, PickupWindow, UserId,
};
use toolshare_core::domain::tier::RiskTier;

use super::category::parse_decimal;
use super::{decode_error, ListingRepository, RepositoryError};
use crate::DbPool;

const LISTING_COLUMNS: &str = "id, owner_id, title, brand, category_id, tier_override,
    daily_price, images_json, description, booking_type, accepts_barter, min_rental_days,
    location_address, pickup_opens_at, pickup_closes_at, manual_url, created_at, updated_at";

pub struct SqlListingRepository {
    pool: DbPool,
}

impl SqlListingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

fn parse_time(column: &str, raw: &str) -> Result<NaiveTime, RepositoryError> {
    NaiveTime::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

fn row_to_listing(row: &sqlx::sqlite::SqliteRow) -> Result<Listing, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let owner_id: String = row.try_get("owner_id").map_err(decode_error)?;
    let category_id: Option<String> = row.try_get("category_id").map_err(decode_error)?;
    let tier_override: Option<i64> = row.try_get("tier_override").map_err(decode_error)?;
    let daily_price: String = row.try_get("daily_price").map_err(decode_error)?;
    let images_json: String = row.try_get("images_json").map_err(decode_error)?;
    let booking_type: String = row.try_get("booking_type").map_err(decode_error)?;
    let min_rental_days: i64 = row.try_get("min_rental_days").map_err(decode_error)?;
    let opens_at: Option<String> = row.try_get("pickup_opens_at").map_err(decode_error)?;
    let closes_at: Option<String> = row.try_get("pickup_closes_at").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    let pickup_window = match (opens_at, closes_at) {
        (Some(opens_at), Some(closes_at)) => Some(PickupWindow {
            opens_at: parse_time("pickup_opens_at", &opens_at)?,
            closes_at: parse_time("pickup_closes_at", &closes_at)?,
        }),
        _ => None,
    };

    let draft = ListingDraft {
        title: row.try_get("title").map_err(decode_error)?,
        brand: row.try_get("brand").map_err(decode_error)?,
        category_id: category_id.map(CategoryId),
        tier_override: tier_override.map(RiskTier::try_from).transpose().map_err(decode_error)?,
        daily_price: parse_decimal("daily_price", &daily_price)?,
        images: serde_json::from_str(&images_json).map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        booking_type: BookingType::from_str(&booking_type).map_err(decode_error)?,
        accepts_barter: row.try_get("accepts_barter").map_err(decode_error)?,
        min_rental_days: u32::try_from(min_rental_days).map_err(decode_error)?,
        location_address: row.try_get("location_address").map_err(decode_error)?,
        pickup_window,
        manual_url: row.try_get("manual_url").map_err(decode_error)?,
    };

    Ok(Listing {
        id: ListingId(id),
        owner_id: UserId(owner_id),
        draft,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

fn bind_listing<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    listing: &'q Listing,
    images_json: String,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let draft = &listing.draft;
    query
        .bind(&listing.owner_id.0)
        .bind(&draft.title)
        .bind(&draft.brand)
        .bind(draft.category_id.as_ref().map(|id| id.0.as_str()))
        .bind(draft.tier_override.map(|tier| i64::from(tier.as_u8())))
        .bind(draft.daily_price.to_string())
        .bind(images_json)
        .bind(&draft.description)
        .bind(draft.booking_type.as_str())
        .bind(draft.accepts_barter)
        .bind(i64::from(draft.min_rental_days))
        .bind(&draft.location_address)
        .bind(draft.pickup_window.map(|window| window.opens_at.to_string()))
        .bind(draft.pickup_window.map(|window| window.closes_at.to_string()))
        .bind(draft.manual_url.as_deref())
        .bind(format_timestamp(&listing.updated_at))
        .bind(&listing.id.0)
}

#[async_trait]
impl ListingRepository for SqlListingRepository {
    async fn create(&self, listing: Listing) -> Result<(), RepositoryError> {
        let images_json = serde_json::to_string(&listing.draft.images).map_err(decode_error)?;

        let query = sqlx::query(
            "INSERT INTO listing (owner_id, title, brand, category_id, tier_override,
                                  daily_price, images_json, description, booking_type,
                                  accepts_barter, min_rental_days, location_address,
                                  pickup_opens_at, pickup_closes_at, manual_url, updated_at,
                                  id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        );
        let result = bind_listing(query, &listing, images_json)
            .bind(format_timestamp(&listing.created_at))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                Err(RepositoryError::Conflict(format!("listing `{}`", listing.id)))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn update(&self, listing: Listing) -> Result<(), RepositoryError> {
        let images_json = serde_json::to_string(&listing.draft.images).map_err(decode_error)?;

        let query = sqlx::query(
            "UPDATE listing SET
                 owner_id = ?, title = ?, brand = ?, category_id = ?, tier_override = ?,
                 daily_price = ?, images_json = ?, description = ?, booking_type = ?,
                 accepts_barter = ?, min_rental_days = ?, location_address = ?,
                 pickup_opens_at = ?, pickup_closes_at = ?, manual_url = ?, updated_at = ?
             WHERE id = ?",
        );
        let result = bind_listing(query, &listing, images_json).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("listing `{}`", listing.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {LISTING_COLUMNS} FROM listing WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_listing).transpose()
    }
}
