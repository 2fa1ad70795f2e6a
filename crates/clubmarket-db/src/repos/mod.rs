//! Repository implementations

mod fee_config;
mod listing;
mod message;
mod payment;
mod rating;

pub use fee_config::FeeConfigRepo;
pub use listing::{ListingRepo, ListingSearch, ListingSort};
pub use message::MessageRepo;
pub use payment::PaymentRepo;
pub use rating::RatingRepo;
