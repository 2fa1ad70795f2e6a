//! Rating enums

use serde::{Deserialize, Serialize};
use std::fmt;

/// Moderation state of a seller rating. Buyer ratings carry no status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerRatingStatus {
    Pending,
    Approved,
    Rejected,
}

impl SellerRatingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellerRatingStatus::Pending => "pending",
            SellerRatingStatus::Approved => "approved",
            SellerRatingStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SellerRatingStatus::Pending),
            "approved" => Some(SellerRatingStatus::Approved),
            "rejected" => Some(SellerRatingStatus::Rejected),
            _ => None,
        }
    }

    /// Pending and approved ratings appear on the seller's public review
    /// page; rejected ones are kept for audit only.
    pub fn is_visible(&self) -> bool {
        !matches!(self, SellerRatingStatus::Rejected)
    }
}

impl fmt::Display for SellerRatingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SellerRatingStatus::Pending,
            SellerRatingStatus::Approved,
            SellerRatingStatus::Rejected,
        ] {
            assert_eq!(SellerRatingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SellerRatingStatus::parse("published"), None);
        assert_eq!(SellerRatingStatus::parse("hidden"), None);
    }

    #[test]
    fn test_visibility() {
        assert!(SellerRatingStatus::Pending.is_visible());
        assert!(SellerRatingStatus::Approved.is_visible());
        assert!(!SellerRatingStatus::Rejected.is_visible());
    }
}
