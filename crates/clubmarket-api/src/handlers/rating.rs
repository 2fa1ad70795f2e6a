//! Reputation handlers
//!
//! Eligibility hangs off the accepted offer for the listing: the transaction
//! must be marked received, each side rates once, and the insert path keeps
//! the running totals in step.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use clubmarket_core::ratings::{average, validate_rating};
use clubmarket_db::{DbBuyerRating, DbMessage, DbSellerRating};
use clubmarket_types::SellerRatingStatus;

use crate::dto::{
    BuyerRatingRequest, BuyerRatingResponse, SellerRatingRequest, SellerRatingResponse,
    SellerReviewsResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthenticatedUser, Pagination, ValidatedJson};
use crate::handlers::listing::fetch_listing;
use crate::state::AppState;

/// The accepted, received transaction for a listing, or the error explaining
/// why rating is not open yet.
async fn completed_transaction(state: &AppState, item_id: Uuid) -> ApiResult<DbMessage> {
    let msg = state
        .db
        .message_repo()
        .accepted_offer_for_item(item_id)
        .await?
        .ok_or_else(|| {
            ApiError::InvalidState("no accepted offer exists for this listing".to_string())
        })?;
    if !msg.completed_transaction {
        return Err(ApiError::InvalidState(
            "the buyer has not marked the item as received".to_string(),
        ));
    }
    Ok(msg)
}

/// Buyer rates the seller once per completed transaction. The rating enters
/// moderation as pending but counts toward the aggregate immediately; a later
/// admin rejection backs it out.
pub async fn rate_seller(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<SellerRatingRequest>,
) -> ApiResult<Json<SellerRatingResponse>> {
    validate_rating(req.rating, req.comment.as_deref())?;

    let listing = fetch_listing(&state, req.item_id).await?;
    let msg = completed_transaction(&state, req.item_id).await?;

    if msg.sender_id != user.user_id {
        return Err(ApiError::Forbidden(
            "only the buyer of this listing can rate the seller".to_string(),
        ));
    }
    if msg.buyer_rated {
        return Err(ApiError::Conflict(
            "you have already rated this seller for this listing".to_string(),
        ));
    }

    let rating = DbSellerRating {
        id: Uuid::new_v4(),
        seller_id: listing.seller_id,
        reviewer_id: user.user_id,
        item_id: listing.id,
        rating: req.rating,
        comment: req.comment,
        status: SellerRatingStatus::Pending.as_str().to_string(),
        created_at: Utc::now(),
    };
    let saved = state
        .db
        .rating_repo()
        .create_seller_rating(&rating, msg.id)
        .await?;

    tracing::info!(
        seller_id = %saved.seller_id,
        item_id = %saved.item_id,
        rating = saved.rating,
        "seller rated"
    );

    Ok(Json(saved.into()))
}

/// Seller rates the buyer once per completed transaction.
pub async fn rate_buyer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<BuyerRatingRequest>,
) -> ApiResult<Json<BuyerRatingResponse>> {
    validate_rating(req.rating, req.comment.as_deref())?;

    let listing = fetch_listing(&state, req.item_id).await?;
    let msg = completed_transaction(&state, req.item_id).await?;

    if listing.seller_id != user.user_id {
        return Err(ApiError::Forbidden(
            "only the seller of this listing can rate the buyer".to_string(),
        ));
    }
    if msg.seller_rated {
        return Err(ApiError::Conflict(
            "you have already rated this buyer for this listing".to_string(),
        ));
    }

    let rating = DbBuyerRating {
        id: Uuid::new_v4(),
        buyer_id: msg.sender_id,
        reviewer_id: user.user_id,
        item_id: listing.id,
        rating: req.rating,
        comment: req.comment,
        created_at: Utc::now(),
    };
    let saved = state
        .db
        .rating_repo()
        .create_buyer_rating(&rating, msg.id)
        .await?;

    Ok(Json(saved.into()))
}

/// Public review page for a seller: running aggregate plus the visible
/// (pending or approved) ratings, newest first.
pub async fn seller_reviews(
    State(state): State<Arc<AppState>>,
    Path(seller_id): Path<Uuid>,
    Pagination(page): Pagination,
) -> ApiResult<Json<SellerReviewsResponse>> {
    let repo = state.db.rating_repo();
    let totals = repo.totals_for_user(seller_id).await?;
    let ratings = repo
        .seller_ratings(seller_id, page.limit(100), page.offset())
        .await?;

    let (sum, count) = totals.map(|t| (t.rating_sum, t.rating_count)).unwrap_or((0, 0));

    Ok(Json(SellerReviewsResponse {
        seller_id,
        average: average(sum, count),
        count,
        ratings: ratings.into_iter().map(Into::into).collect(),
        page: page.page,
        limit: page.limit,
    }))
}
