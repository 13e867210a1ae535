pub mod block;
pub mod category;
pub mod listing;
pub mod rental;
pub mod settings;
pub mod tier;
