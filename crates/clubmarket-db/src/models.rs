//! Database models - mapped from PostgreSQL tables
//!
//! Status and enum columns are stored as lowercase snake_case strings; the
//! typed enums in `clubmarket-types` own the conversion.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Listing Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbListing {
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
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub flag_count: i32,
    pub flagged_for_review_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub rating_sum: i64,
    pub rating_count: i64,
    pub is_featured: bool,
    pub featured_until: Option<DateTime<Utc>>,
    pub sold_at: Option<DateTime<Utc>>,
    pub sold_to: Option<Uuid>,
    pub sold_price: Option<Decimal>,
    pub posting_fee: Decimal,
    pub total_fees_paid: Decimal,
    pub extension_count: i32,
    pub last_extended_at: Option<DateTime<Utc>>,
    pub last_extension_payment_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbListingFlag {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub reporter_id: Option<Uuid>,
    pub reason: String,
    pub description: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Negotiation Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbMessage {
    pub id: Uuid,
    pub item_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message_type: String,
    pub content: String,
    pub offer_amount: Option<Decimal>,
    pub status: String,
    pub read_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub original_offer_id: Option<Uuid>,
    pub marked_received_at: Option<DateTime<Utc>>,
    pub buyer_rated: bool,
    pub seller_rated: bool,
    pub completed_transaction: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Fee Configuration Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbFeeConfig {
    pub id: Uuid,
    pub posting_fee: Decimal,
    pub extension_fee: Decimal,
    pub featured_fee: Decimal,
    pub premium_fee: Decimal,
    pub fee_type: String,
    pub default_expiration_days: i32,
    pub extension_days: i32,
    pub max_extensions: i32,
    pub free_posting_limit: i32,
    pub free_extension_limit: i32,
    pub currency: String,
    pub is_active: bool,
    pub effective_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Payment Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbPayment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub payment_type: String,
    pub status: String,
    pub payment_method: String,
    pub external_payment_id: Option<String>,
    pub fee_config_id: Option<Uuid>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refunded_by: Option<Uuid>,
    pub refund_reason: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Rating Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSellerRating {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub reviewer_id: Uuid,
    pub item_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbBuyerRating {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub reviewer_id: Uuid,
    pub item_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbRatingTotals {
    pub user_id: Uuid,
    pub rating_sum: i64,
    pub rating_count: i64,
    pub updated_at: DateTime<Utc>,
}
