//! Negotiation handlers
//!
//! Offers, counter-offers, and the accept/reject lifecycle. Validation lives
//! in `clubmarket-core`; the race-sensitive transitions are conditional
//! updates in the repo layer, so a lost race surfaces as `InvalidState` here.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use clubmarket_core::negotiation::{
    ensure_receivable, ensure_resolvable, ensure_withdrawable, MessageView, NewOffer, OfferContext,
};
use clubmarket_db::DbMessage;
use clubmarket_types::{MessageId, MessageStatus, MessageType, UserId};

use crate::dto::{
    AcceptOfferResponse, ContactSellerRequest, MessageResponse, Paginated, RejectOfferRequest,
    SendMessageRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthenticatedUser, Pagination, ValidatedJson};
use crate::handlers::listing::{fetch_listing, parse_status};
use crate::notify::{dispatch, Notification};
use crate::state::AppState;

async fn fetch_message(state: &AppState, id: Uuid) -> ApiResult<DbMessage> {
    state
        .db
        .message_repo()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Message {} not found", id)))
}

fn view_of(msg: &DbMessage) -> ApiResult<MessageView> {
    let message_type = MessageType::parse(&msg.message_type)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown message type: {}", msg.message_type)))?;
    let status = MessageStatus::parse(&msg.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown message status: {}", msg.status)))?;
    Ok(MessageView {
        id: MessageId::from_uuid(msg.id),
        sender_id: UserId::from_uuid(msg.sender_id),
        recipient_id: UserId::from_uuid(msg.recipient_id),
        message_type,
        status,
        marked_received: msg.marked_received_at.is_some(),
    })
}

/// Send a message, offer, or counter-offer on a listing.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let message_type = MessageType::parse(&req.message_type)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown message type: {}", req.message_type)))?;
    if !matches!(
        message_type,
        MessageType::Message | MessageType::Offer | MessageType::CounterOffer
    ) {
        return Err(ApiError::BadRequest(
            "only message, offer, and counter_offer can be sent directly".to_string(),
        ));
    }

    let listing = fetch_listing(&state, req.item_id).await?;
    let recipient_id = req.recipient_id.unwrap_or(listing.seller_id);

    let offer = NewOffer {
        sender_id: UserId::from_uuid(user.user_id),
        recipient_id: UserId::from_uuid(recipient_id),
        message_type,
        content: req.content.clone(),
        offer_amount: req.offer_amount,
        parent_offer_id: req.parent_offer_id.map(MessageId::from_uuid),
    };
    let ctx = OfferContext {
        seller_id: UserId::from_uuid(listing.seller_id),
        status: parse_status(&listing.status)?,
        is_negotiable: listing.is_negotiable,
    };
    offer.validate(&ctx)?;

    // A counter-offer must answer a real offer on the same listing.
    if let Some(parent_id) = req.parent_offer_id {
        let parent = fetch_message(&state, parent_id).await?;
        if parent.item_id != listing.id {
            return Err(ApiError::ValidationError(
                "parent offer belongs to a different listing".to_string(),
            ));
        }
    }

    let msg = DbMessage {
        id: Uuid::new_v4(),
        item_id: listing.id,
        sender_id: user.user_id,
        recipient_id,
        message_type: message_type.as_str().to_string(),
        content: req.content,
        offer_amount: req.offer_amount,
        status: MessageStatus::Pending.as_str().to_string(),
        read_at: None,
        is_active: true,
        original_offer_id: req.parent_offer_id,
        marked_received_at: None,
        buyer_rated: false,
        seller_rated: false,
        completed_transaction: false,
        created_at: chrono::Utc::now(),
    };
    let msg = state.db.message_repo().create(&msg).await?;

    if message_type.carries_amount() {
        dispatch(
            state.notifier.as_ref(),
            recipient_id,
            Notification::OfferReceived {
                item_id: listing.id,
                message_id: msg.id,
            },
        )
        .await;
    }

    Ok(Json(msg.into()))
}

/// First contact with a seller: a plain message routed to the listing owner.
pub async fn contact_seller(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ContactSellerRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let listing = fetch_listing(&state, item_id).await?;
    if listing.seller_id == user.user_id {
        return Err(ApiError::ValidationError(
            "you cannot message yourself".to_string(),
        ));
    }
    if !parse_status(&listing.status)?.is_publicly_visible() {
        return Err(ApiError::NotFound(format!("Listing {} not found", item_id)));
    }

    let msg = DbMessage {
        id: Uuid::new_v4(),
        item_id: listing.id,
        sender_id: user.user_id,
        recipient_id: listing.seller_id,
        message_type: MessageType::Message.as_str().to_string(),
        content: req.content,
        offer_amount: None,
        status: MessageStatus::Pending.as_str().to_string(),
        read_at: None,
        is_active: true,
        original_offer_id: None,
        marked_received_at: None,
        buyer_rated: false,
        seller_rated: false,
        completed_transaction: false,
        created_at: chrono::Utc::now(),
    };
    let msg = state.db.message_repo().create(&msg).await?;
    Ok(Json(msg.into()))
}

/// Accept a pending offer. One transaction accepts the offer and rejects
/// every competing pending offer; the listing is then marked sold at the
/// accepted amount.
pub async fn accept_offer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AcceptOfferResponse>> {
    let msg = fetch_message(&state, id).await?;
    ensure_resolvable(&view_of(&msg)?, UserId::from_uuid(user.user_id))?;

    let amount = msg
        .offer_amount
        .ok_or_else(|| ApiError::InvalidState("offer carries no amount".to_string()))?;

    let (accepted, rejected_siblings) = state.db.message_repo().accept(id).await?;

    // Second step, externally sequenced: the listing closes at the accepted
    // price. If this fails the offer stays accepted and the sale can be
    // completed by an admin override.
    let listing = state
        .db
        .listing_repo()
        .mark_sold(accepted.item_id, accepted.sender_id, amount)
        .await?;

    dispatch(
        state.notifier.as_ref(),
        accepted.sender_id,
        Notification::OfferAccepted {
            item_id: accepted.item_id,
            message_id: accepted.id,
        },
    )
    .await;

    tracing::info!(
        message_id = %accepted.id,
        item_id = %accepted.item_id,
        rejected_siblings,
        "offer accepted"
    );

    Ok(Json(AcceptOfferResponse {
        message: accepted.into(),
        rejected_siblings,
        listing: listing.into(),
    }))
}

/// Reject a pending offer. No sibling effects.
pub async fn reject_offer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RejectOfferRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let msg = fetch_message(&state, id).await?;
    ensure_resolvable(&view_of(&msg)?, UserId::from_uuid(user.user_id))?;

    let rejected = state.db.message_repo().reject(id).await?;

    if let Some(reason) = req.reason {
        tracing::debug!(message_id = %id, reason = %reason, "offer rejected with note");
    }
    dispatch(
        state.notifier.as_ref(),
        rejected.sender_id,
        Notification::OfferRejected {
            item_id: rejected.item_id,
            message_id: rejected.id,
        },
    )
    .await;

    Ok(Json(rejected.into()))
}

/// Withdraw a pending offer (sender only).
pub async fn withdraw_offer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let msg = fetch_message(&state, id).await?;
    ensure_withdrawable(&view_of(&msg)?, UserId::from_uuid(user.user_id))?;

    let withdrawn = state.db.message_repo().withdraw(id).await?;
    Ok(Json(withdrawn.into()))
}

/// Buyer confirms the item arrived, unlocking ratings.
pub async fn mark_received(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let msg = fetch_message(&state, id).await?;
    ensure_receivable(&view_of(&msg)?, UserId::from_uuid(user.user_id))?;

    let msg = state.db.message_repo().mark_received(id).await?;
    Ok(Json(msg.into()))
}

/// Recipient marks a message read.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let msg = state.db.message_repo().mark_read(id, user.user_id).await?;
    Ok(Json(msg.into()))
}

/// Message thread between the caller and another user for a listing. The
/// caller's unread messages in the thread are marked read as a side effect.
pub async fn conversation(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path((item_id, other_user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let repo = state.db.message_repo();
    let msgs = repo.conversation(item_id, user.user_id, other_user_id).await?;
    repo.mark_conversation_read(item_id, user.user_id).await?;
    Ok(Json(msgs.into_iter().map(Into::into).collect()))
}

/// Pending offers on a listing. Seller and admins only; offer amounts from
/// competing buyers are not public.
pub async fn active_offers(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let listing = fetch_listing(&state, item_id).await?;
    if listing.seller_id != user.user_id && !user.is_admin() {
        return Err(ApiError::Forbidden(
            "only the seller can list offers on a listing".to_string(),
        ));
    }

    let msgs = state.db.message_repo().active_offers(item_id).await?;
    Ok(Json(msgs.into_iter().map(Into::into).collect()))
}

/// The caller's received messages, newest first.
pub async fn inbox(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Pagination(page): Pagination,
) -> ApiResult<Json<Paginated<MessageResponse>>> {
    let msgs = state
        .db
        .message_repo()
        .inbox(user.user_id, page.limit(100), page.offset())
        .await?;
    Ok(Json(Paginated::new(
        msgs.into_iter().map(Into::into).collect(),
        page.page,
        page.limit,
    )))
}
