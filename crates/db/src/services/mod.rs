//! Application services that combine repositories, reference data and messaging.

pub mod listings;
pub mod rentals;

pub use listings::ListingService;
pub use rentals::RentalService;
