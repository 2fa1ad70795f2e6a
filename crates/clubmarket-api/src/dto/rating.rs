//! Rating DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use clubmarket_db::{DbBuyerRating, DbSellerRating};

/// Buyer rates the seller for a completed transaction
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SellerRatingRequest {
    pub item_id: Uuid,

    #[validate(range(min = 1, max = 5))]
    pub rating: i32,

    #[validate(length(max = 500))]
    #[serde(default)]
    pub comment: Option<String>,
}

/// Seller rates the buyer for a completed transaction
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BuyerRatingRequest {
    pub item_id: Uuid,

    #[validate(range(min = 1, max = 5))]
    pub rating: i32,

    #[validate(length(max = 500))]
    #[serde(default)]
    pub comment: Option<String>,
}

/// Seller rating projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerRatingResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub reviewer_id: Uuid,
    pub item_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbSellerRating> for SellerRatingResponse {
    fn from(r: DbSellerRating) -> Self {
        Self {
            id: r.id,
            seller_id: r.seller_id,
            reviewer_id: r.reviewer_id,
            item_id: r.item_id,
            rating: r.rating,
            comment: r.comment,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

/// Buyer rating projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerRatingResponse {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub reviewer_id: Uuid,
    pub item_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbBuyerRating> for BuyerRatingResponse {
    fn from(r: DbBuyerRating) -> Self {
        Self {
            id: r.id,
            buyer_id: r.buyer_id,
            reviewer_id: r.reviewer_id,
            item_id: r.item_id,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

/// A user's reviews with the running aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerReviewsResponse {
    pub seller_id: Uuid,
    pub average: Option<f64>,
    pub count: i64,
    pub ratings: Vec<SellerRatingResponse>,
    pub page: u32,
    pub limit: u32,
}
