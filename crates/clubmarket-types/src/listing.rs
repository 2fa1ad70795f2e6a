//! Listing enums - categories, condition, moderation status, flag reasons
//!
//! Enums are stored as lowercase snake_case strings in the database; each
//! carries `as_str`/`parse` for the conversion at the repo boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of marketplace categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Apparel,
    Footwear,
    Equipment,
    Training,
    Tickets,
    Memorabilia,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Apparel => "apparel",
            Category::Footwear => "footwear",
            Category::Equipment => "equipment",
            Category::Training => "training",
            Category::Tickets => "tickets",
            Category::Memorabilia => "memorabilia",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "apparel" => Some(Category::Apparel),
            "footwear" => Some(Category::Footwear),
            "equipment" => Some(Category::Equipment),
            "training" => Some(Category::Training),
            "tickets" => Some(Category::Tickets),
            "memorabilia" => Some(Category::Memorabilia),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical condition of a listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::LikeNew => "like_new",
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Condition::New),
            "like_new" => Some(Condition::LikeNew),
            "excellent" => Some(Condition::Excellent),
            "good" => Some(Condition::Good),
            "fair" => Some(Condition::Fair),
            "poor" => Some(Condition::Poor),
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation lifecycle of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
    Sold,
    Expired,
    FlaggedForReview,
    RemovedByFlags,
    Restored,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
            ListingStatus::Sold => "sold",
            ListingStatus::Expired => "expired",
            ListingStatus::FlaggedForReview => "flagged_for_review",
            ListingStatus::RemovedByFlags => "removed_by_flags",
            ListingStatus::Restored => "restored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ListingStatus::Pending),
            "approved" => Some(ListingStatus::Approved),
            "rejected" => Some(ListingStatus::Rejected),
            "sold" => Some(ListingStatus::Sold),
            "expired" => Some(ListingStatus::Expired),
            "flagged_for_review" => Some(ListingStatus::FlaggedForReview),
            "removed_by_flags" => Some(ListingStatus::RemovedByFlags),
            "restored" => Some(ListingStatus::Restored),
            _ => None,
        }
    }

    /// Statuses visible on the public surface
    pub fn is_publicly_visible(&self) -> bool {
        matches!(self, ListingStatus::Approved | ListingStatus::Restored)
    }

    /// A live listing can still receive offers
    pub fn accepts_offers(&self) -> bool {
        matches!(self, ListingStatus::Approved | ListingStatus::Restored)
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a user can report a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    ProhibitedItem,
    Counterfeit,
    Misleading,
    Offensive,
    Scam,
    WrongCategory,
    Other,
}

impl FlagReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagReason::ProhibitedItem => "prohibited_item",
            FlagReason::Counterfeit => "counterfeit",
            FlagReason::Misleading => "misleading",
            FlagReason::Offensive => "offensive",
            FlagReason::Scam => "scam",
            FlagReason::WrongCategory => "wrong_category",
            FlagReason::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prohibited_item" => Some(FlagReason::ProhibitedItem),
            "counterfeit" => Some(FlagReason::Counterfeit),
            "misleading" => Some(FlagReason::Misleading),
            "offensive" => Some(FlagReason::Offensive),
            "scam" => Some(FlagReason::Scam),
            "wrong_category" => Some(FlagReason::WrongCategory),
            "other" => Some(FlagReason::Other),
            _ => None,
        }
    }
}

impl fmt::Display for FlagReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unresolved flags that push an approved listing into review
pub const FLAG_REVIEW_THRESHOLD: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            ListingStatus::Pending,
            ListingStatus::Approved,
            ListingStatus::Rejected,
            ListingStatus::Sold,
            ListingStatus::Expired,
            ListingStatus::FlaggedForReview,
            ListingStatus::RemovedByFlags,
            ListingStatus::Restored,
        ] {
            assert_eq!(ListingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ListingStatus::parse("bogus"), None);
    }

    #[test]
    fn test_public_visibility() {
        assert!(ListingStatus::Approved.is_publicly_visible());
        assert!(ListingStatus::Restored.is_publicly_visible());
        assert!(!ListingStatus::Pending.is_publicly_visible());
        assert!(!ListingStatus::Sold.is_publicly_visible());
    }

    #[test]
    fn test_serde_matches_db_strings() {
        let json = serde_json::to_string(&ListingStatus::FlaggedForReview).unwrap();
        assert_eq!(json, "\"flagged_for_review\"");
        let json = serde_json::to_string(&Condition::LikeNew).unwrap();
        assert_eq!(json, "\"like_new\"");
    }
}
