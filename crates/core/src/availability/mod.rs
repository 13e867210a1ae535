pub mod calendar;
pub mod normalize;
pub mod selection;

pub use calendar::{BookedInterval, RawInterval, UnavailableDateSet};
pub use normalize::normalize_endpoint;
pub use selection::{
    validate_booking_range, CollisionPolicy, DateRangeSelection, SelectionOutcome, SelectionState,
};
