//! Listing handlers
//!
//! Catalogue browsing, listing lifecycle, favorites, and community flags.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use clubmarket_core::listing::{expiry_from, slug_for, NewListing};
use clubmarket_core::payments::intent_expiry;
use clubmarket_db::{DbListing, DbListingFlag, DbPayment, ListingSearch, ListingSort};
use clubmarket_types::{
    Category, Condition, FlagReason, ListingId, ListingStatus, PaymentMethod, PaymentStatus,
    PaymentType,
};

use crate::dto::{
    Ack, CreateListingRequest, CreateListingResponse, FlagListingRequest, ListingResponse,
    Paginated, SearchListingsQuery, UpdateListingRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthenticatedUser, OptionalUser, Pagination, ValidatedJson};
use crate::handlers::month_start;
use crate::state::AppState;

pub(crate) async fn fetch_listing(state: &AppState, id: Uuid) -> ApiResult<DbListing> {
    state
        .db
        .listing_repo()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Listing {} not found", id)))
}

pub(crate) fn parse_status(s: &str) -> ApiResult<ListingStatus> {
    ListingStatus::parse(s)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown listing status: {}", s)))
}

/// Create a listing. The listing starts in `pending` moderation regardless of
/// the request, and the posting-fee intent is created alongside it (already
/// completed when the post falls inside the monthly free allowance).
pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<CreateListingRequest>,
) -> ApiResult<Json<CreateListingResponse>> {
    let category = Category::parse(&req.category)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown category: {}", req.category)))?;
    let condition = Condition::parse(&req.condition)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown condition: {}", req.condition)))?;
    let method = PaymentMethod::parse(&req.payment_method)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment method: {}", req.payment_method)))?;

    let new_listing = NewListing {
        title: req.title.clone(),
        description: req.description.clone(),
        price: req.price,
        currency: req.currency.clone(),
        category,
        subcategory: req.subcategory.clone(),
        brand: req.brand.clone(),
        size: req.size.clone(),
        color: req.color.clone(),
        condition,
        location: req.location.clone(),
        is_negotiable: req.is_negotiable,
        images: req.images.clone(),
    };
    new_listing.validate()?;

    let schedule = state.fees.current()?;

    let now = Utc::now();
    let posts_this_month = state
        .db
        .listing_repo()
        .count_created_since(user.user_id, month_start(now))
        .await?;
    let posting_fee = schedule.posting_fee_for(posts_this_month)?;

    let id = Uuid::new_v4();
    let listing = DbListing {
        id,
        seller_id: user.user_id,
        slug: slug_for(&req.title, ListingId::from_uuid(id)),
        title: req.title,
        description: req.description,
        price: req.price,
        currency: req.currency.clone(),
        category: category.as_str().to_string(),
        subcategory: req.subcategory,
        brand: req.brand,
        size: req.size,
        color: req.color,
        condition: condition.as_str().to_string(),
        location: req.location,
        is_negotiable: req.is_negotiable,
        images: req.images,
        status: ListingStatus::Pending.as_str().to_string(),
        admin_notes: None,
        reviewed_by: None,
        reviewed_at: None,
        flag_count: 0,
        flagged_for_review_at: None,
        views: 0,
        rating_sum: 0,
        rating_count: 0,
        is_featured: false,
        featured_until: None,
        sold_at: None,
        sold_to: None,
        sold_price: None,
        posting_fee,
        total_fees_paid: Decimal::ZERO,
        extension_count: 0,
        last_extended_at: None,
        last_extension_payment_id: None,
        expires_at: expiry_from(now, schedule.default_expiration_days as i64),
        created_at: now,
        updated_at: now,
    };
    let listing = state.db.listing_repo().create(&listing).await?;

    // Zero-amount intents are recorded already completed so free-tier usage
    // stays countable from the ledger.
    let free = posting_fee.is_zero();
    let payment = DbPayment {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        item_id: Some(listing.id),
        amount: posting_fee,
        currency: req.currency,
        payment_type: PaymentType::PostingFee.as_str().to_string(),
        status: if free { PaymentStatus::Completed } else { PaymentStatus::Pending }
            .as_str()
            .to_string(),
        payment_method: method.as_str().to_string(),
        external_payment_id: None,
        fee_config_id: Some(schedule.id.as_uuid()),
        description: Some(format!("Posting fee for listing {}", listing.slug)),
        metadata: serde_json::json!({}),
        processed_at: free.then_some(now),
        processed_by: None,
        refunded_at: None,
        refunded_by: None,
        refund_reason: None,
        refund_amount: None,
        expires_at: intent_expiry(now),
        created_at: now,
    };
    let payment = state.db.payment_repo().create(&payment).await?;

    tracing::info!(
        listing_id = %listing.id,
        seller_id = %user.user_id,
        posting_fee = %posting_fee,
        "listing created"
    );

    Ok(Json(CreateListingResponse {
        listing: listing.into(),
        posting_fee_payment: payment.into(),
    }))
}

/// Public catalogue search. Only approved/restored listings are visible.
pub async fn search_listings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchListingsQuery>,
    Pagination(page): Pagination,
) -> ApiResult<Json<Paginated<ListingResponse>>> {
    let sort = match query.sort.as_deref() {
        None => ListingSort::default(),
        Some(s) => ListingSort::parse(s)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown sort: {}", s)))?,
    };

    // Closed vocabularies are validated up front so a typo reads as an error
    // instead of an empty result page.
    if let Some(c) = query.category.as_deref() {
        Category::parse(c).ok_or_else(|| ApiError::BadRequest(format!("Unknown category: {}", c)))?;
    }
    if let Some(c) = query.condition.as_deref() {
        Condition::parse(c)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown condition: {}", c)))?;
    }

    let search = ListingSearch {
        category: query.category,
        subcategory: query.subcategory,
        condition: query.condition,
        brand: query.brand,
        seller_id: query.seller_id,
        min_price: query.min_price,
        max_price: query.max_price,
        query: query.q,
        featured_only: query.featured,
        sort,
        limit: page.limit(100),
        offset: page.offset(),
    };
    let listings = state.db.listing_repo().search(&search).await?;

    Ok(Json(Paginated::new(
        listings.into_iter().map(Into::into).collect(),
        page.page,
        page.limit,
    )))
}

/// Fetch one listing by id or slug. Public views bump the view counter;
/// hidden listings are visible only to their seller and admins.
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    OptionalUser(viewer): OptionalUser,
    Path(id_or_slug): Path<String>,
) -> ApiResult<Json<ListingResponse>> {
    let repo = state.db.listing_repo();
    let listing = match Uuid::parse_str(&id_or_slug) {
        Ok(id) => repo.find_by_id(id).await?,
        Err(_) => repo.find_by_slug(&id_or_slug).await?,
    }
    .ok_or_else(|| ApiError::NotFound(format!("Listing {} not found", id_or_slug)))?;

    let status = parse_status(&listing.status)?;
    let is_owner_or_admin = viewer
        .as_ref()
        .map(|u| u.user_id == listing.seller_id || u.is_admin())
        .unwrap_or(false);

    if !status.is_publicly_visible() && !is_owner_or_admin {
        return Err(ApiError::NotFound(format!("Listing {} not found", id_or_slug)));
    }

    if status.is_publicly_visible() && !is_owner_or_admin {
        repo.increment_views(listing.id).await?;
    }

    Ok(Json(listing.into()))
}

/// The caller's own listings, any status.
pub async fn my_listings(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Pagination(page): Pagination,
) -> ApiResult<Json<Paginated<ListingResponse>>> {
    let listings = state
        .db
        .listing_repo()
        .find_by_seller(user.user_id, page.limit(100), page.offset())
        .await?;
    Ok(Json(Paginated::new(
        listings.into_iter().map(Into::into).collect(),
        page.page,
        page.limit,
    )))
}

/// Owner edits, allowed while the listing is pending or live.
pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateListingRequest>,
) -> ApiResult<Json<ListingResponse>> {
    let current = fetch_listing(&state, id).await?;
    if current.seller_id != user.user_id {
        return Err(ApiError::Forbidden("only the seller can edit a listing".to_string()));
    }

    let title = req.title.unwrap_or(current.title);
    let slug = slug_for(&title, ListingId::from_uuid(current.id));
    let price = req.price.unwrap_or(current.price);
    if price < Decimal::ZERO {
        return Err(ApiError::ValidationError("price must not be negative".to_string()));
    }

    let listing = state
        .db
        .listing_repo()
        .update_details(
            id,
            user.user_id,
            &title,
            &slug,
            &req.description.unwrap_or(current.description),
            price,
            req.is_negotiable.unwrap_or(current.is_negotiable),
            &req.images.unwrap_or(current.images),
            req.location.or(current.location).as_deref(),
        )
        .await?;
    Ok(Json(listing.into()))
}

/// Owner/admin deletion; refused while an accepted negotiation or settled
/// payment references the listing.
pub async fn delete_listing(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Ack>> {
    let listing = fetch_listing(&state, id).await?;
    if listing.seller_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden("only the seller or an admin can delete a listing".to_string()));
    }

    state.db.listing_repo().delete(id).await?;
    tracing::info!(listing_id = %id, actor = %user.user_id, "listing deleted");
    Ok(Json(Ack::ok()))
}

/// Toggle a favorite. Returns whether the listing is now favorited.
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let listing = fetch_listing(&state, id).await?;
    let repo = state.db.listing_repo();

    let favorited = if repo.remove_favorite(listing.id, user.user_id).await? {
        false
    } else {
        repo.add_favorite(listing.id, user.user_id).await?;
        true
    };
    Ok(Json(serde_json::json!({ "favorited": favorited })))
}

/// The caller's favorited listings.
pub async fn my_favorites(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Pagination(page): Pagination,
) -> ApiResult<Json<Paginated<ListingResponse>>> {
    let listings = state
        .db
        .listing_repo()
        .favorites_for_user(user.user_id, page.limit(100), page.offset())
        .await?;
    Ok(Json(Paginated::new(
        listings.into_iter().map(Into::into).collect(),
        page.page,
        page.limit,
    )))
}

/// Community flag. The third unresolved flag on a live listing pulls it out
/// of the catalogue for review.
pub async fn flag_listing(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<FlagListingRequest>,
) -> ApiResult<Json<ListingResponse>> {
    let reason = FlagReason::parse(&req.reason)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown flag reason: {}", req.reason)))?;

    let listing = fetch_listing(&state, id).await?;
    if listing.seller_id == user.user_id {
        return Err(ApiError::ValidationError("you cannot flag your own listing".to_string()));
    }

    let flag = DbListingFlag {
        id: Uuid::new_v4(),
        listing_id: listing.id,
        reporter_id: Some(user.user_id),
        reason: reason.as_str().to_string(),
        description: req.description,
        resolved: false,
        created_at: Utc::now(),
    };
    let (_, listing) = state.db.listing_repo().flag(&flag).await?;

    if listing.status == ListingStatus::FlaggedForReview.as_str() {
        tracing::warn!(
            listing_id = %listing.id,
            flag_count = listing.flag_count,
            "listing flagged for review"
        );
        crate::notify::dispatch(
            state.notifier.as_ref(),
            listing.seller_id,
            crate::notify::Notification::ListingFlagged { item_id: listing.id },
        )
        .await;
    }

    Ok(Json(listing.into()))
}
