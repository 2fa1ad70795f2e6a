//! Public fee schedule handler

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;

/// Public projection of the active fee schedule
#[derive(Debug, Serialize)]
pub struct CurrentFeesResponse {
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
    pub effective_date: DateTime<Utc>,
}

/// The fee schedule currently in force. Served from the in-memory cache;
/// answers 503 until an admin installs a configuration.
pub async fn current_fees(State(state): State<Arc<AppState>>) -> ApiResult<Json<CurrentFeesResponse>> {
    let s = state.fees.current()?;
    Ok(Json(CurrentFeesResponse {
        posting_fee: s.posting_fee,
        extension_fee: s.extension_fee,
        featured_fee: s.featured_fee,
        premium_fee: s.premium_fee,
        fee_type: s.fee_type.as_str().to_string(),
        default_expiration_days: s.default_expiration_days,
        extension_days: s.extension_days,
        max_extensions: s.max_extensions,
        free_posting_limit: s.free_posting_limit,
        free_extension_limit: s.free_extension_limit,
        currency: s.currency,
        effective_date: s.effective_date,
    }))
}
