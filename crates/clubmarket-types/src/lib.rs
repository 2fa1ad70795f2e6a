//! Clubmarket Types - foundation types for the club marketplace
//!
//! This crate contains the foundational types shared by every other
//! clubmarket crate, with zero dependencies on the rest of the workspace:
//!
//! - Identity types (ListingId, MessageId, PaymentId, ...)
//! - Listing enums (category, condition, moderation status, flag reasons)
//! - Negotiation enums (message type and status)
//! - Payment and fee enums
//! - The shared `DomainError` taxonomy

pub mod error;
pub mod fees;
pub mod id;
pub mod listing;
pub mod negotiation;
pub mod payment;
pub mod ratings;

pub use error::*;
pub use fees::*;
pub use id::*;
pub use listing::*;
pub use negotiation::*;
pub use payment::*;
pub use ratings::*;
