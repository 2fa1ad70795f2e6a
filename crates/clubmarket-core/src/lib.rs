//! Clubmarket Core - domain rules for the club marketplace
//!
//! Pure, synchronous domain logic with no I/O:
//!
//! - Listing moderation state machine and slug derivation
//! - Negotiation preconditions (offer, counter-offer, accept, reject,
//!   withdraw, receipt confirmation)
//! - Fee schedule math and the cached fee configuration service
//! - Payment intent lifecycle guards
//! - Rating validation and aggregate math
//!
//! The database layer applies these rules inside transactions; the rules
//! themselves are testable without a database.

pub mod fees;
pub mod listing;
pub mod negotiation;
pub mod payments;
pub mod ratings;

pub use fees::{FeeSchedule, FeeService};
pub use listing::{can_transition, slug_for, NewListing};
pub use negotiation::{NewOffer, OfferContext};
