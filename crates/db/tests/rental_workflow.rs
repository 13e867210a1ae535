use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use toolshare_core::catalog::ReferenceDataCache;
use toolshare_core::domain::category::CategoryId;
use toolshare_core::domain::listing::{BookingType, ListingDraft, ListingPolicy, UserId};
use toolshare_core::domain::rental::{ChatId, RentalStatus};
use toolshare_core::domain::tier::RiskTier;
use toolshare_core::messaging::MessageTemplate;
use toolshare_core::suggestions::CategorySuggester;
use toolshare_db::repositories::{
    SqlAvailabilityRepository, SqlCategoryRepository, SqlListingRepository, SqlRentalRepository,
    SqlSystemMessenger,
};
use toolshare_db::{
    connect_with_settings, migrations, DbPool, ListingService, ReferenceSeedDataset, RentalService,
};

async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    ReferenceSeedDataset::load(&pool).await.expect("seed");
    pool
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, day).expect("valid date")
}

#[tokio::test]
async fn listing_to_extension_round_trip_over_sqlite() {
    let pool = seeded_pool().await;
    let categories = Arc::new(SqlCategoryRepository::new(pool.clone()));
    let cache = Arc::new(ReferenceDataCache::new());
    let messenger = Arc::new(SqlSystemMessenger::new(pool.clone()));

    let listings = ListingService::new(
        Arc::new(SqlListingRepository::new(pool.clone())),
        categories.clone(),
        cache.clone(),
        ListingPolicy::default(),
    );
    let rentals = RentalService::new(
        Arc::new(SqlRentalRepository::new(pool.clone())),
        Arc::new(SqlAvailabilityRepository::new(pool.clone())),
        Arc::new(SqlListingRepository::new(pool.clone())),
        categories.clone(),
        cache,
        messenger.clone(),
    );

    let suggested = categories
        .suggest_category("Werner extension ladder")
        .await
        .expect("suggestion")
        .expect("ladder category");
    assert_eq!(suggested.id, CategoryId("ladders".to_string()));
    assert_eq!(suggested.default_risk_tier, RiskTier::Medium);

    let owner = UserId("owner".to_string());
    let renter = UserId("renter".to_string());
    let listing = listings
        .create_listing(
            owner.clone(),
            ListingDraft {
                title: "Extension ladder".to_string(),
                brand: "Werner".to_string(),
                category_id: Some(suggested.id.clone()),
                daily_price: Decimal::new(1200, 2),
                images: vec!["a.jpg".to_string(), "b.jpg".to_string()],
                booking_type: BookingType::Request,
                min_rental_days: 1,
                location_address: "4 Oak Ave".to_string(),
                ..ListingDraft::default()
            },
        )
        .await
        .expect("create listing");

    let chat = ChatId("chat-42".to_string());
    let rental = rentals
        .request(&listing.id, renter.clone(), Some(chat.clone()), date(1), date(3))
        .await
        .expect("request");
    rentals.approve(&rental.id, &owner).await.expect("approve");
    rentals.request_extension(&rental.id, &renter, date(5)).await.expect("extension");
    let extended = rentals.approve_extension(&rental.id, &owner).await.expect("approve extension");

    assert_eq!(extended.status, RentalStatus::Approved);
    assert_eq!(extended.end_date, date(5));

    let blocked = rentals.blocked_days(&listing.id).await.expect("blocked days");
    assert_eq!(blocked.len(), 5);

    let templates: Vec<MessageTemplate> = messenger
        .list_for_chat(&chat)
        .await
        .expect("chat messages")
        .into_iter()
        .map(|message| message.template)
        .collect();
    assert_eq!(
        templates,
        vec![
            MessageTemplate::RentalRequested,
            MessageTemplate::RentalApproved,
            MessageTemplate::ExtensionRequested,
            MessageTemplate::ExtensionApproved,
        ]
    );

    let quote = listings.quote(&listing.id, 5).await.expect("quote");
    assert_eq!(quote.peace_fund_total, Decimal::new(2000, 2));
    assert_eq!(quote.service_fee, Decimal::new(600, 2));
}
