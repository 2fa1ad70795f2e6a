//! Negotiation DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use clubmarket_db::DbMessage;

/// Send a message, offer, or counter-offer
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub item_id: Uuid,

    /// Defaults to the listing's seller when omitted
    #[serde(default)]
    pub recipient_id: Option<Uuid>,

    /// "message", "offer", or "counter_offer"
    pub message_type: String,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub offer_amount: Option<Decimal>,

    /// Offer being answered; required for counter-offers
    #[serde(default)]
    pub parent_offer_id: Option<Uuid>,
}

/// First contact with a seller about a listing
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactSellerRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

/// Reject an offer with an optional note
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RejectOfferRequest {
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub reason: Option<String>,
}

/// Message projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
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
    pub completed_transaction: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbMessage> for MessageResponse {
    fn from(m: DbMessage) -> Self {
        Self {
            id: m.id,
            item_id: m.item_id,
            sender_id: m.sender_id,
            recipient_id: m.recipient_id,
            message_type: m.message_type,
            content: m.content,
            offer_amount: m.offer_amount,
            status: m.status,
            read_at: m.read_at,
            is_active: m.is_active,
            original_offer_id: m.original_offer_id,
            marked_received_at: m.marked_received_at,
            completed_transaction: m.completed_transaction,
            created_at: m.created_at,
        }
    }
}

/// Result of accepting an offer: the accepted message, how many competing
/// offers were swept, and the listing now marked sold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptOfferResponse {
    pub message: MessageResponse,
    pub rejected_siblings: u64,
    pub listing: super::ListingResponse,
}
