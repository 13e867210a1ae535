use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use toolshare_core::domain::listing::{ListingId, UserId};
use toolshare_core::domain::rental::{
    ChatId, ExtensionRequest, RentalId, RentalRequest, RentalStatus,
};

use super::listing::{format_timestamp, parse_timestamp};
use super::{decode_error, RentalRepository, RepositoryError};
use crate::DbPool;

const RENTAL_COLUMNS: &str = "id, listing_id, owner_id, renter_id, chat_id, start_date,
    end_date, status, extension_requested_end, extension_requested_at, created_at, updated_at";

pub struct SqlRentalRepository {
    pool: DbPool,
}

impl SqlRentalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

fn row_to_rental(row: &sqlx::sqlite::SqliteRow) -> Result<RentalRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let listing_id: String = row.try_get("listing_id").map_err(decode_error)?;
    let owner_id: String = row.try_get("owner_id").map_err(decode_error)?;
    let renter_id: String = row.try_get("renter_id").map_err(decode_error)?;
    let chat_id: Option<String> = row.try_get("chat_id").map_err(decode_error)?;
    let start_date: String = row.try_get("start_date").map_err(decode_error)?;
    let end_date: String = row.try_get("end_date").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let requested_end: Option<String> =
        row.try_get("extension_requested_end").map_err(decode_error)?;
    let requested_at: Option<String> =
        row.try_get("extension_requested_at").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    let status = RentalStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown rental status `{status}`")))?;
    let pending_extension = match (requested_end, requested_at) {
        (Some(end), Some(at)) => Some(ExtensionRequest {
            requested_end: parse_date("extension_requested_end", &end)?,
            requested_at: parse_timestamp("extension_requested_at", &at)?,
        }),
        _ => None,
    };

    Ok(RentalRequest {
        id: RentalId(id),
        listing_id: ListingId(listing_id),
        owner_id: UserId(owner_id),
        renter_id: UserId(renter_id),
        chat_id: chat_id.map(ChatId),
        start_date: parse_date("start_date", &start_date)?,
        end_date: parse_date("end_date", &end_date)?,
        status,
        pending_extension,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait]
impl RentalRepository for SqlRentalRepository {
    async fn find_by_id(&self, id: &RentalId) -> Result<Option<RentalRequest>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {RENTAL_COLUMNS} FROM rental WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_rental).transpose()
    }

    async fn save(&self, rental: RentalRequest) -> Result<(), RepositoryError> {
        let extension = rental.pending_extension.as_ref();

        sqlx::query(
            "INSERT INTO rental (id, listing_id, owner_id, renter_id, chat_id, start_date,
                                 end_date, status, extension_requested_end,
                                 extension_requested_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 chat_id = excluded.chat_id,
                 start_date = excluded.start_date,
                 end_date = excluded.end_date,
                 status = excluded.status,
                 extension_requested_end = excluded.extension_requested_end,
                 extension_requested_at = excluded.extension_requested_at,
                 updated_at = excluded.updated_at",
        )
        .bind(&rental.id.0)
        .bind(&rental.listing_id.0)
        .bind(&rental.owner_id.0)
        .bind(&rental.renter_id.0)
        .bind(rental.chat_id.as_ref().map(|chat| chat.0.as_str()))
        .bind(rental.start_date.to_string())
        .bind(rental.end_date.to_string())
        .bind(rental.status.as_str())
        .bind(extension.map(|extension| extension.requested_end.to_string()))
        .bind(extension.map(|extension| format_timestamp(&extension.requested_at)))
        .bind(format_timestamp(&rental.created_at))
        .bind(format_timestamp(&rental.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Vec<RentalRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rental WHERE listing_id = ? ORDER BY start_date ASC"
        ))
        .bind(&listing_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rental).collect()
    }

    async fn list_pending_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<RentalRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rental
             WHERE owner_id = ?
               AND (status = 'pending' OR extension_requested_end IS NOT NULL)
             ORDER BY created_at ASC"
        ))
        .bind(&owner_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rental).collect()
    }
}
