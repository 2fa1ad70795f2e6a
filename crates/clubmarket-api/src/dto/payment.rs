//! Payment DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use clubmarket_db::DbPayment;

/// Create a posting-fee intent for a listing whose fee is still unpaid
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostingFeeRequest {
    pub item_id: Uuid,

    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

/// Create an extension-fee intent for a live listing
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtensionFeeRequest {
    pub item_id: Uuid,

    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_payment_method() -> String {
    "card".to_string()
}

/// Settle a pending intent with the external processor's reference
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProcessPaymentRequest {
    #[validate(length(max = 200))]
    #[serde(default)]
    pub external_payment_id: Option<String>,
}

/// Admin refund of a completed payment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefundPaymentRequest {
    pub amount: Decimal,

    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Payment projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub payment_type: String,
    pub status: String,
    pub payment_method: String,
    pub external_payment_id: Option<String>,
    pub description: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<DbPayment> for PaymentResponse {
    fn from(p: DbPayment) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            item_id: p.item_id,
            amount: p.amount,
            currency: p.currency,
            payment_type: p.payment_type,
            status: p.status,
            payment_method: p.payment_method,
            external_payment_id: p.external_payment_id,
            description: p.description,
            refund_amount: p.refund_amount,
            expires_at: p.expires_at,
            created_at: p.created_at,
        }
    }
}

/// Refund outcome: the original row plus the compensating ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub original: PaymentResponse,
    pub refund: PaymentResponse,
}

/// Outcome of the expiry sweep (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    pub expired_listings: u64,
    pub cancelled_payments: u64,
}
