//! Request and response DTOs

mod admin;
mod common;
mod fees;
mod listing;
mod message;
mod payment;
mod rating;

pub use admin::*;
pub use common::*;
pub use fees::*;
pub use listing::*;
pub use message::*;
pub use payment::*;
pub use rating::*;
