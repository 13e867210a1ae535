pub mod availability;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod messaging;
pub mod pricing;
pub mod suggestions;

pub use availability::{
    normalize_endpoint, validate_booking_range, BookedInterval, CollisionPolicy,
    DateRangeSelection, RawInterval, SelectionOutcome, UnavailableDateSet,
};
pub use catalog::{ReferenceDataCache, ReferenceDataSource};
pub use domain::block::{OwnerBlock, OwnerBlockId};
pub use domain::category::{Category, CategoryId};
pub use domain::listing::{
    BookingType, Listing, ListingDraft, ListingId, ListingPatch, ListingPolicy,
    ListingValidationError, PickupWindow, UserId,
};
pub use domain::rental::{ChatId, ExtensionRequest, RentalId, RentalRequest, RentalStatus};
pub use domain::settings::PlatformSettings;
pub use domain::tier::{lookup, RiskTier, TierProfile};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use messaging::{MessageContext, MessageTemplate, MessagingError, SystemMessenger};
pub use pricing::{compute_financials, quote_rental, Financials, RentalQuote};
pub use suggestions::{
    CategorySuggester, DebouncedCategorySuggester, SuggestionController, SuggestionError,
    SuggestionSettings, SuggestionState,
};
