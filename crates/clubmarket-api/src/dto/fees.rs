//! Fee configuration DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use clubmarket_db::DbFeeConfig;

/// Install a new fee configuration version (admin)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFeeConfigRequest {
    pub posting_fee: Decimal,
    pub extension_fee: Decimal,
    pub featured_fee: Decimal,
    pub premium_fee: Decimal,

    #[serde(default = "default_fee_type")]
    pub fee_type: String,

    #[validate(range(min = 1, max = 365))]
    pub default_expiration_days: i32,

    #[validate(range(min = 1, max = 365))]
    pub extension_days: i32,

    #[validate(range(min = 0, max = 100))]
    pub max_extensions: i32,

    #[validate(range(min = 0, max = 1000))]
    pub free_posting_limit: i32,

    #[validate(range(min = 0, max = 1000))]
    pub free_extension_limit: i32,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub effective_date: Option<DateTime<Utc>>,
}

fn default_fee_type() -> String {
    "fixed".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Fee configuration projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfigResponse {
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
    pub created_at: DateTime<Utc>,
}

impl From<DbFeeConfig> for FeeConfigResponse {
    fn from(c: DbFeeConfig) -> Self {
        Self {
            id: c.id,
            posting_fee: c.posting_fee,
            extension_fee: c.extension_fee,
            featured_fee: c.featured_fee,
            premium_fee: c.premium_fee,
            fee_type: c.fee_type,
            default_expiration_days: c.default_expiration_days,
            extension_days: c.extension_days,
            max_extensions: c.max_extensions,
            free_posting_limit: c.free_posting_limit,
            free_extension_limit: c.free_extension_limit,
            currency: c.currency,
            is_active: c.is_active,
            effective_date: c.effective_date,
            created_at: c.created_at,
        }
    }
}
