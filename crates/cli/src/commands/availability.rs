use chrono::NaiveDate;
use serde::Serialize;
use toolshare_core::availability::{
    normalize_endpoint, validate_booking_range, BookedInterval, CollisionPolicy,
    DateRangeSelection, SelectionOutcome, UnavailableDateSet,
};
use toolshare_core::catalog::ReferenceDataCache;
use toolshare_core::domain::listing::ListingId;
use toolshare_db::repositories::{
    AvailabilityRepository, ListingRepository, SqlAvailabilityRepository, SqlCategoryRepository,
    SqlListingRepository,
};

use crate::commands::{interface_failure, open_pool, run_with_config, CommandError, CommandResult};

#[derive(Clone, Debug)]
pub struct AvailabilityArgs {
    pub listing: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
struct AvailabilityReport {
    listing_id: String,
    blocked_days: usize,
    blocked_ranges: Vec<BookedInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested: Option<RangeCheck>,
}

#[derive(Debug, Serialize)]
struct RangeCheck {
    range: BookedInterval,
    bookable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    calendar: PickerReplay,
}

/// What the calendar picker does with the same two clicks under `booking.collision_policy`.
#[derive(Debug, PartialEq, Eq, Serialize)]
struct PickerReplay {
    policy: CollisionPolicy,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<BookedInterval>,
}

/// Blocked calendar for a listing. With `--start/--end`, also reports whether that
/// range could be booked under the listing's minimum and the platform maximum, and how
/// the date picker would treat the same clicks.
pub fn run(args: AvailabilityArgs) -> CommandResult {
    run_with_config("availability", |config| async move {
        let requested = parse_range(args.start.as_deref(), args.end.as_deref())?;

        let pool = open_pool(&config).await?;
        let listing_id = ListingId(args.listing.clone());
        let listing = SqlListingRepository::new(pool.clone())
            .find_by_id(&listing_id)
            .await
            .map_err(interface_failure)?
            .ok_or_else(|| ("not_found", format!("unknown listing `{listing_id}`"), 7u8))?;

        let raw = SqlAvailabilityRepository::new(pool.clone())
            .list_blocked_intervals_for_listing(&listing_id)
            .await
            .map_err(interface_failure)?;
        let blocked = UnavailableDateSet::from_raw(&raw);

        let requested = match requested {
            Some(range) => {
                let settings = ReferenceDataCache::new()
                    .platform_settings(&SqlCategoryRepository::new(pool.clone()))
                    .await
                    .map_err(interface_failure)?;
                let verdict = validate_booking_range(
                    &blocked,
                    range,
                    listing.draft.min_rental_days,
                    settings.max_rental_days,
                );
                Some(RangeCheck {
                    range,
                    bookable: verdict.is_ok(),
                    reason: verdict.err().map(|error| error.to_string()),
                    calendar: replay_picker(&blocked, range, config.booking.collision_policy),
                })
            }
            None => None,
        };
        pool.close().await;

        let report = AvailabilityReport {
            listing_id: listing_id.to_string(),
            blocked_days: blocked.len(),
            blocked_ranges: blocked.to_intervals(),
            requested,
        };
        serde_json::to_string(&report).map_err(|error| ("serialization", error.to_string(), 9u8))
    })
}

fn replay_picker(
    blocked: &UnavailableDateSet,
    range: BookedInterval,
    policy: CollisionPolicy,
) -> PickerReplay {
    let mut picker = DateRangeSelection::new(blocked.clone(), policy);
    let outcome = match picker.pick(range.start).and_then(|_| picker.pick(range.end)) {
        Ok(SelectionOutcome::Selected(_)) => "selected",
        Ok(SelectionOutcome::Collapsed(_)) => "collapsed",
        Ok(SelectionOutcome::Anchored(_)) => "anchored",
        Ok(SelectionOutcome::Unchanged) => "unchanged",
        Err(_) => "rejected",
    };
    PickerReplay { policy, outcome, selected: picker.selected_range() }
}

fn parse_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<BookedInterval>, CommandError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = parse_day("--start", start)?;
            let end = parse_day("--end", end)?;
            Ok(Some(BookedInterval { start, end }))
        }
        _ => Err(("invalid_input", "--start and --end must be given together".to_string(), 8u8)),
    }
}

fn parse_day(flag: &str, raw: &str) -> Result<NaiveDate, CommandError> {
    normalize_endpoint(raw)
        .ok_or_else(|| ("invalid_input", format!("{flag} `{raw}` is not a date"), 8u8))
}
