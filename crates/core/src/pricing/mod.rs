pub mod financials;
pub mod quote;

pub use financials::{compute_financials, effective_tier, validate_tier_override, Financials};
pub use quote::{quote_rental, RentalQuote, RentalQuoteInput, RentalQuoteStep};
