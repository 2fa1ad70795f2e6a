//! Listing DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use clubmarket_core::ratings::average;
use clubmarket_db::DbListing;

/// Create a new listing
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,

    pub price: Decimal,

    #[serde(default = "default_currency")]
    pub currency: String,

    pub category: String,

    #[serde(default)]
    pub subcategory: Option<String>,

    #[serde(default)]
    pub brand: Option<String>,

    #[serde(default)]
    pub size: Option<String>,

    #[serde(default)]
    pub color: Option<String>,

    pub condition: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default = "default_true")]
    pub is_negotiable: bool,

    #[validate(length(min = 1, max = 5))]
    pub images: Vec<String>,

    /// How the seller intends to pay the posting fee
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_true() -> bool {
    true
}

fn default_payment_method() -> String {
    "card".to_string()
}

/// Update an existing listing (owner only, while pending or live)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub price: Option<Decimal>,

    pub is_negotiable: Option<bool>,

    #[validate(length(min = 1, max = 5))]
    pub images: Option<Vec<String>>,

    pub location: Option<String>,
}

/// Flag a listing for moderation
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FlagListingRequest {
    pub reason: String,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: Option<String>,
}

/// Catalogue search parameters
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchListingsQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub seller_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Free-text search over title and description
    pub q: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub sort: Option<String>,
}

/// Public listing projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub condition: String,
    pub location: Option<String>,
    pub is_negotiable: bool,
    pub images: Vec<String>,
    pub status: String,
    pub views: i64,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
    pub is_featured: bool,
    pub sold_price: Option<Decimal>,
    pub extension_count: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<DbListing> for ListingResponse {
    fn from(l: DbListing) -> Self {
        Self {
            id: l.id,
            seller_id: l.seller_id,
            slug: l.slug,
            title: l.title,
            description: l.description,
            price: l.price,
            currency: l.currency,
            category: l.category,
            subcategory: l.subcategory,
            brand: l.brand,
            size: l.size,
            color: l.color,
            condition: l.condition,
            location: l.location,
            is_negotiable: l.is_negotiable,
            images: l.images,
            status: l.status,
            views: l.views,
            rating_average: average(l.rating_sum, l.rating_count),
            rating_count: l.rating_count,
            is_featured: l.is_featured,
            sold_price: l.sold_price,
            extension_count: l.extension_count,
            expires_at: l.expires_at,
            created_at: l.created_at,
        }
    }
}

/// Response for listing creation: the pending listing plus the posting-fee
/// payment intent (already completed when the post was free)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListingResponse {
    pub listing: ListingResponse,
    pub posting_fee_payment: super::PaymentResponse,
}
