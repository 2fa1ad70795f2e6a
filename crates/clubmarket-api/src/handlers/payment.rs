//! Payment handlers
//!
//! Intents are created here and settled via `process`. Settling an
//! extension-fee intent is what actually extends the listing; that step is
//! idempotent on the payment id, so a retried `process` cannot extend twice.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use clubmarket_core::listing::ensure_extendable;
use clubmarket_core::payments::{ensure_cancellable, ensure_completable, intent_expiry};
use clubmarket_db::DbPayment;
use clubmarket_types::{PaymentMethod, PaymentStatus, PaymentType};

use crate::dto::{
    ExtensionFeeRequest, Paginated, PaymentResponse, PostingFeeRequest, ProcessPaymentRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthenticatedUser, Pagination, ValidatedJson};
use crate::handlers::listing::{fetch_listing, parse_status};
use crate::handlers::month_start;
use crate::state::AppState;

pub(crate) async fn fetch_payment(state: &AppState, id: Uuid) -> ApiResult<DbPayment> {
    state
        .db
        .payment_repo()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payment {} not found", id)))
}

pub(crate) fn parse_payment_status(s: &str) -> ApiResult<PaymentStatus> {
    PaymentStatus::parse(s)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment status: {}", s)))
}

fn parse_method(s: &str) -> ApiResult<PaymentMethod> {
    PaymentMethod::parse(s)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment method: {}", s)))
}

fn intent(
    user_id: Uuid,
    item_id: Uuid,
    amount: Decimal,
    currency: &str,
    payment_type: PaymentType,
    method: PaymentMethod,
    fee_config_id: Uuid,
    description: String,
) -> DbPayment {
    let now = Utc::now();
    let free = amount.is_zero();
    DbPayment {
        id: Uuid::new_v4(),
        user_id,
        item_id: Some(item_id),
        amount,
        currency: currency.to_string(),
        payment_type: payment_type.as_str().to_string(),
        status: if free {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        }
        .as_str()
        .to_string(),
        payment_method: method.as_str().to_string(),
        external_payment_id: None,
        fee_config_id: Some(fee_config_id),
        description: Some(description),
        metadata: serde_json::json!({}),
        processed_at: free.then_some(now),
        processed_by: None,
        refunded_at: None,
        refunded_by: None,
        refund_reason: None,
        refund_amount: None,
        expires_at: intent_expiry(now),
        created_at: now,
    }
}

/// Recreate the posting-fee intent for a listing whose fee is still unpaid,
/// for example after the original intent expired.
pub async fn create_posting_fee(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<PostingFeeRequest>,
) -> ApiResult<Json<PaymentResponse>> {
    let listing = fetch_listing(&state, req.item_id).await?;
    if listing.seller_id != user.user_id {
        return Err(ApiError::Forbidden(
            "only the seller can pay the posting fee".to_string(),
        ));
    }
    let method = parse_method(&req.payment_method)?;

    // One live posting-fee payment per listing: an open or settled intent
    // makes a new one a conflict.
    let existing = state.db.payment_repo().find_by_item(listing.id).await?;
    let posting = PaymentType::PostingFee.as_str();
    for p in &existing {
        if p.payment_type == posting
            && matches!(
                parse_payment_status(&p.status)?,
                PaymentStatus::Pending | PaymentStatus::Completed
            )
        {
            return Err(ApiError::Conflict(
                "posting fee is already paid or pending".to_string(),
            ));
        }
    }

    let payment = intent(
        user.user_id,
        listing.id,
        listing.posting_fee,
        &listing.currency,
        PaymentType::PostingFee,
        method,
        state.fees.current()?.id.as_uuid(),
        format!("Posting fee for listing {}", listing.slug),
    );
    let payment = state.db.payment_repo().create(&payment).await?;
    Ok(Json(payment.into()))
}

/// Create an extension-fee intent for a live listing. Free-allowance intents
/// come back already completed and the listing is extended immediately.
pub async fn create_extension_fee(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<ExtensionFeeRequest>,
) -> ApiResult<Json<PaymentResponse>> {
    let listing = fetch_listing(&state, req.item_id).await?;
    if listing.seller_id != user.user_id {
        return Err(ApiError::Forbidden(
            "only the seller can extend a listing".to_string(),
        ));
    }
    let method = parse_method(&req.payment_method)?;
    let schedule = state.fees.current()?;

    let status = parse_status(&listing.status)?;
    ensure_extendable(status, listing.extension_count, schedule.max_extensions)?;

    let extensions_this_month = state
        .db
        .payment_repo()
        .count_completed_since(
            user.user_id,
            PaymentType::ExtensionFee.as_str(),
            month_start(Utc::now()),
        )
        .await?;
    let fee = schedule.extension_fee_for(extensions_this_month)?;

    let payment = intent(
        user.user_id,
        listing.id,
        fee,
        &schedule.currency,
        PaymentType::ExtensionFee,
        method,
        schedule.id.as_uuid(),
        format!("Extension fee for listing {}", listing.slug),
    );
    let payment = state.db.payment_repo().create(&payment).await?;

    if fee.is_zero() {
        state
            .db
            .listing_repo()
            .extend_for_payment(
                listing.id,
                payment.id,
                schedule.extension_days,
                Decimal::ZERO,
                schedule.max_extensions,
            )
            .await?;
    }

    Ok(Json(payment.into()))
}

/// Settle a pending intent, then apply its effect: posting fees roll into
/// the listing's paid total, extension fees push the expiry out.
pub async fn process_payment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ProcessPaymentRequest>,
) -> ApiResult<Json<PaymentResponse>> {
    let payment = fetch_payment(&state, id).await?;
    if payment.user_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden(
            "payment belongs to another user".to_string(),
        ));
    }

    let now = Utc::now();
    let status = parse_payment_status(&payment.status)?;
    if let Err(e) = ensure_completable(status, payment.expires_at, now) {
        if matches!(e, clubmarket_types::DomainError::Expired(_)) {
            // The intent outlived its window; close it out so the sweep does
            // not have to.
            let _ = state
                .db
                .payment_repo()
                .fail(id, "payment intent expired")
                .await;
        }
        return Err(e.into());
    }

    let processed_by = user.is_admin().then_some(user.user_id);
    let payment = state
        .db
        .payment_repo()
        .complete(id, req.external_payment_id.as_deref(), processed_by)
        .await?;

    match PaymentType::parse(&payment.payment_type) {
        Some(PaymentType::PostingFee) => {
            if let Some(item_id) = payment.item_id {
                state
                    .db
                    .listing_repo()
                    .record_fee_payment(item_id, payment.amount)
                    .await?;
            }
        }
        Some(PaymentType::ExtensionFee) => {
            if let Some(item_id) = payment.item_id {
                let schedule = state.fees.current()?;
                state
                    .db
                    .listing_repo()
                    .extend_for_payment(
                        item_id,
                        payment.id,
                        schedule.extension_days,
                        payment.amount,
                        schedule.max_extensions,
                    )
                    .await?;
            }
        }
        _ => {}
    }

    tracing::info!(
        payment_id = %payment.id,
        payment_type = %payment.payment_type,
        amount = %payment.amount,
        "payment completed"
    );

    Ok(Json(payment.into()))
}

/// Cancel the caller's own pending intent.
pub async fn cancel_payment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PaymentResponse>> {
    let payment = fetch_payment(&state, id).await?;
    if payment.user_id != user.user_id {
        return Err(ApiError::Forbidden(
            "payment belongs to another user".to_string(),
        ));
    }
    ensure_cancellable(parse_payment_status(&payment.status)?)?;

    let payment = state.db.payment_repo().cancel(id, user.user_id).await?;
    Ok(Json(payment.into()))
}

/// The caller's payment history, newest first.
pub async fn my_payments(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Pagination(page): Pagination,
) -> ApiResult<Json<Paginated<PaymentResponse>>> {
    let payments = state
        .db
        .payment_repo()
        .find_by_user(user.user_id, page.limit(100), page.offset())
        .await?;
    Ok(Json(Paginated::new(
        payments.into_iter().map(Into::into).collect(),
        page.page,
        page.limit,
    )))
}

/// Payments recorded against one listing. Seller and admins only.
pub async fn payments_for_item(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PaymentResponse>>> {
    let listing = fetch_listing(&state, item_id).await?;
    if listing.seller_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden(
            "payments are visible to the seller only".to_string(),
        ));
    }
    let payments = state.db.payment_repo().find_by_item(item_id).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}
