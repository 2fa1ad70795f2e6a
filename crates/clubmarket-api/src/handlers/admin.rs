//! Administration handlers
//!
//! Everything here sits behind `RequireAdmin`. Moderation transitions go
//! through the listing state machine; `override_status` is the deliberate
//! escape hatch and always leaves an audit note.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use clubmarket_core::listing::ensure_transition;
use clubmarket_core::payments::ensure_refundable;
use clubmarket_core::FeeSchedule;
use clubmarket_db::{DbFeeConfig, DbPayment};
use clubmarket_types::{FeeConfigId, FeeType, ListingStatus, SellerRatingStatus, UserId};

use crate::dto::{
    CreateFeeConfigRequest, FeatureListingRequest, FeeConfigResponse, ListingFlagResponse,
    ListingResponse, ModerateRatingRequest, ModerationQueueQuery, OverrideStatusRequest, Paginated,
    RefundPaymentRequest, RefundResponse, ResolveFlagsRequest, RevenueQuery, RevenueResponse,
    SellerRatingResponse, SetListingStatusRequest, SweepResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{Pagination, RequireAdmin, ValidatedJson};
use crate::handlers::listing::{fetch_listing, parse_status};
use crate::handlers::month_start;
use crate::handlers::payment::{fetch_payment, parse_payment_status};
use crate::state::AppState;

/// Moderation transition along the listing state machine.
pub async fn set_listing_status(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SetListingStatusRequest>,
) -> ApiResult<Json<ListingResponse>> {
    let to = parse_status(&req.status)?;
    let listing = fetch_listing(&state, id).await?;
    let from = parse_status(&listing.status)?;
    ensure_transition(from, to)?;

    // Leaving review resolves the open flags in the same transaction.
    let updated = if from == ListingStatus::FlaggedForReview
        && matches!(to, ListingStatus::Restored | ListingStatus::RemovedByFlags)
    {
        state
            .db
            .listing_repo()
            .resolve_flags(id, to == ListingStatus::Restored, admin.user_id, req.notes.as_deref())
            .await?
    } else {
        state
            .db
            .listing_repo()
            .set_status(id, from, to, admin.user_id, req.notes.as_deref())
            .await?
    };

    if !to.accepts_offers() && from.accepts_offers() {
        let expired = state.db.message_repo().expire_pending_for_item(id).await?;
        if expired > 0 {
            tracing::debug!(listing_id = %id, expired, "expired pending offers on moderated listing");
        }
    }

    tracing::info!(
        listing_id = %id,
        from = from.as_str(),
        to = to.as_str(),
        admin_id = %admin.user_id,
        "listing status changed"
    );

    Ok(Json(updated.into()))
}

/// Unconditional status override, bypassing the state machine. The mandatory
/// note is the audit trail.
pub async fn override_status(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<OverrideStatusRequest>,
) -> ApiResult<Json<ListingResponse>> {
    let to = parse_status(&req.status)?;
    let listing = state
        .db
        .listing_repo()
        .override_status(id, to, admin.user_id, &req.notes)
        .await?;

    tracing::warn!(
        listing_id = %id,
        to = to.as_str(),
        admin_id = %admin.user_id,
        notes = %req.notes,
        "listing status overridden"
    );

    Ok(Json(listing.into()))
}

/// Moderation queue, oldest first.
pub async fn moderation_queue(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(query): Query<ModerationQueueQuery>,
    Pagination(page): Pagination,
) -> ApiResult<Json<Paginated<ListingResponse>>> {
    let status = parse_status(&query.status)?;
    let listings = state
        .db
        .listing_repo()
        .find_by_status(status.as_str(), page.limit(100), page.offset())
        .await?;
    Ok(Json(Paginated::new(
        listings.into_iter().map(Into::into).collect(),
        page.page,
        page.limit,
    )))
}

/// All flags filed against a listing.
pub async fn listing_flags(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ListingFlagResponse>>> {
    fetch_listing(&state, id).await?;
    let flags = state.db.listing_repo().flags_for(id).await?;
    Ok(Json(flags.into_iter().map(Into::into).collect()))
}

/// Resolve all open flags on a listing under review, restoring or removing it.
pub async fn resolve_flags(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ResolveFlagsRequest>,
) -> ApiResult<Json<ListingResponse>> {
    let listing = state
        .db
        .listing_repo()
        .resolve_flags(id, req.restore, admin.user_id, req.notes.as_deref())
        .await?;

    if !req.restore {
        state.db.message_repo().expire_pending_for_item(id).await?;
    }

    Ok(Json(listing.into()))
}

/// Put a live listing on the front page for a fixed window.
pub async fn feature_listing(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<FeatureListingRequest>,
) -> ApiResult<Json<ListingResponse>> {
    let until = Utc::now() + Duration::days(req.days);
    let listing = state.db.listing_repo().set_featured(id, until).await?;
    Ok(Json(listing.into()))
}

/// Install a new fee configuration version. The new row becomes active and
/// the in-memory schedule is replaced once the row is committed.
pub async fn create_fee_config(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    ValidatedJson(req): ValidatedJson<CreateFeeConfigRequest>,
) -> ApiResult<Json<FeeConfigResponse>> {
    let fee_type = FeeType::parse(&req.fee_type)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown fee type: {}", req.fee_type)))?;
    // Percentage rows may exist in history but the calculators refuse them,
    // so installing one would take every fee-charging endpoint down.
    if fee_type == FeeType::Percentage {
        return Err(ApiError::ValidationError(
            "percentage fee configurations cannot be installed".to_string(),
        ));
    }

    let now = Utc::now();
    let schedule = FeeSchedule {
        id: FeeConfigId::new(),
        posting_fee: req.posting_fee,
        extension_fee: req.extension_fee,
        featured_fee: req.featured_fee,
        premium_fee: req.premium_fee,
        fee_type,
        default_expiration_days: req.default_expiration_days,
        extension_days: req.extension_days,
        max_extensions: req.max_extensions,
        free_posting_limit: req.free_posting_limit,
        free_extension_limit: req.free_extension_limit,
        currency: req.currency,
        effective_date: req.effective_date.unwrap_or(now),
        created_by: Some(UserId::from_uuid(admin.user_id)),
    };
    schedule.validate()?;

    let config = DbFeeConfig {
        id: schedule.id.as_uuid(),
        posting_fee: schedule.posting_fee,
        extension_fee: schedule.extension_fee,
        featured_fee: schedule.featured_fee,
        premium_fee: schedule.premium_fee,
        fee_type: schedule.fee_type.as_str().to_string(),
        default_expiration_days: schedule.default_expiration_days,
        extension_days: schedule.extension_days,
        max_extensions: schedule.max_extensions,
        free_posting_limit: schedule.free_posting_limit,
        free_extension_limit: schedule.free_extension_limit,
        currency: schedule.currency.clone(),
        is_active: true,
        effective_date: schedule.effective_date,
        created_by: Some(admin.user_id),
        created_at: now,
    };
    let saved = state.db.fee_config_repo().create_active(&config).await?;
    state.fees.install(schedule);

    tracing::info!(
        fee_config_id = %saved.id,
        admin_id = %admin.user_id,
        "fee configuration installed"
    );

    Ok(Json(saved.into()))
}

/// Fee configuration version history, newest first.
pub async fn list_fee_configs(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Pagination(page): Pagination,
) -> ApiResult<Json<Paginated<FeeConfigResponse>>> {
    let configs = state
        .db
        .fee_config_repo()
        .list(page.limit(100), page.offset())
        .await?;
    Ok(Json(Paginated::new(
        configs.into_iter().map(Into::into).collect(),
        page.page,
        page.limit,
    )))
}

/// Refund a completed payment. The original row is preserved and a
/// compensating ledger entry is written.
pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RefundPaymentRequest>,
) -> ApiResult<Json<RefundResponse>> {
    let payment = fetch_payment(&state, id).await?;
    ensure_refundable(
        parse_payment_status(&payment.status)?,
        payment.refunded_at.is_some(),
        payment.amount,
        req.amount,
    )?;

    let refund_row = DbPayment {
        id: Uuid::new_v4(),
        description: Some(format!("Refund of payment {}: {}", payment.id, req.reason)),
        ..payment.clone()
    };
    let (original, refund) = state
        .db
        .payment_repo()
        .refund(id, admin.user_id, &req.reason, req.amount, &refund_row)
        .await?;

    tracing::info!(
        payment_id = %id,
        refund_id = %refund.id,
        amount = %req.amount,
        admin_id = %admin.user_id,
        "payment refunded"
    );

    Ok(Json(RefundResponse {
        original: original.into(),
        refund: refund.into(),
    }))
}

/// Expire overdue listings and cancel stale payment intents in one pass.
/// The server also runs this on a timer; the endpoint exists for operators.
pub async fn sweep_expired(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> ApiResult<Json<SweepResponse>> {
    let expired_listings = state.db.listing_repo().sweep_expired().await?;
    let cancelled_payments = state.db.payment_repo().sweep_expired().await?;

    tracing::info!(expired_listings, cancelled_payments, "expiry sweep complete");

    Ok(Json(SweepResponse {
        expired_listings,
        cancelled_payments,
    }))
}

/// Moderate a seller rating: approval is a status flip, rejection keeps the
/// row for audit and backs its value out of the running totals.
pub async fn moderate_seller_rating(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ModerateRatingRequest>,
) -> ApiResult<Json<SellerRatingResponse>> {
    let verdict = SellerRatingStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown rating status: {}", req.status)))?;

    let rating = match verdict {
        SellerRatingStatus::Approved => state.db.rating_repo().approve_seller_rating(id).await?,
        SellerRatingStatus::Rejected => state.db.rating_repo().reject_seller_rating(id).await?,
        SellerRatingStatus::Pending => {
            return Err(ApiError::BadRequest(
                "a rating cannot be moved back to pending".to_string(),
            ))
        }
    };

    tracing::warn!(
        rating_id = %id,
        seller_id = %rating.seller_id,
        verdict = verdict.as_str(),
        admin_id = %admin.user_id,
        "seller rating moderated"
    );

    Ok(Json(rating.into()))
}

/// Gross completed fee revenue since the given instant.
pub async fn revenue(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(query): Query<RevenueQuery>,
) -> ApiResult<Json<RevenueResponse>> {
    let since = query.since.unwrap_or_else(|| month_start(Utc::now()));
    let total = state.db.payment_repo().revenue_since(since).await?;
    let currency = state
        .fees
        .current()
        .map(|s| s.currency)
        .unwrap_or_else(|_| "EUR".to_string());

    Ok(Json(RevenueResponse {
        since,
        total,
        currency,
    }))
}
