//! Moderation and administration DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use clubmarket_db::DbListingFlag;

/// Moderation transition for a listing
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetListingStatusRequest {
    pub status: String,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: Option<String>,
}

/// Unconditional status override; the note is the audit trail, so it is
/// mandatory here
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OverrideStatusRequest {
    pub status: String,

    #[validate(length(min = 1, max = 1000))]
    pub notes: String,
}

/// Resolve all open flags on a listing under review
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolveFlagsRequest {
    /// `true` restores the listing, `false` removes it
    pub restore: bool,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: Option<String>,
}

/// Feature a listing on the front page for a number of days
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FeatureListingRequest {
    #[validate(range(min = 1, max = 90))]
    pub days: i64,
}

/// Flag projection for the moderation view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingFlagResponse {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub reporter_id: Option<Uuid>,
    pub reason: String,
    pub description: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbListingFlag> for ListingFlagResponse {
    fn from(f: DbListingFlag) -> Self {
        Self {
            id: f.id,
            listing_id: f.listing_id,
            reporter_id: f.reporter_id,
            reason: f.reason,
            description: f.description,
            resolved: f.resolved,
            created_at: f.created_at,
        }
    }
}

/// Moderation verdict on a seller rating: `approved` or `rejected`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ModerateRatingRequest {
    pub status: String,
}

/// Moderation queue filter
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationQueueQuery {
    #[serde(default = "default_queue_status")]
    pub status: String,
}

fn default_queue_status() -> String {
    "pending".to_string()
}

/// Revenue report window; defaults to the start of the current month
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueQuery {
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

/// Gross completed fee revenue over the window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueResponse {
    pub since: DateTime<Utc>,
    pub total: rust_decimal::Decimal,
    pub currency: String,
}
