//! Negotiation rules
//!
//! Preconditions for every mutation of a negotiation message. The chain
//! linking a counter-offer to its predecessor is a tree of parent ids, never
//! an embedded graph. The repo layer applies these checks together with the
//! conditional updates that make accept/reject race-safe.

use rust_decimal::Decimal;

use clubmarket_types::{
    DomainError, DomainResult, ListingStatus, MessageId, MessageStatus, MessageType, UserId,
    MAX_MESSAGE_CONTENT,
};

/// The listing facts an offer is validated against
#[derive(Debug, Clone)]
pub struct OfferContext {
    pub seller_id: UserId,
    pub status: ListingStatus,
    pub is_negotiable: bool,
}

/// A new offer, counter-offer, or plain message before persistence
#[derive(Debug, Clone)]
pub struct NewOffer {
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub message_type: MessageType,
    pub content: String,
    pub offer_amount: Option<Decimal>,
    pub parent_offer_id: Option<MessageId>,
}

impl NewOffer {
    /// Validate against the listing. Buyers initiate offers; the seller may
    /// only send a counter-offer, and only in reply to an existing offer.
    pub fn validate(&self, ctx: &OfferContext) -> DomainResult<()> {
        if self.sender_id == self.recipient_id {
            return Err(DomainError::Validation(
                "sender and recipient must differ".into(),
            ));
        }
        if self.content.len() > MAX_MESSAGE_CONTENT {
            return Err(DomainError::Validation(format!(
                "message content exceeds {} characters",
                MAX_MESSAGE_CONTENT
            )));
        }
        if !ctx.status.accepts_offers() {
            return Err(DomainError::InvalidState(format!(
                "listing is not open for offers (status: {})",
                ctx.status
            )));
        }

        match self.message_type {
            MessageType::Offer | MessageType::CounterOffer => {
                let amount = self.offer_amount.ok_or_else(|| {
                    DomainError::Validation("offer amount is required".into())
                })?;
                if amount <= Decimal::ZERO {
                    return Err(DomainError::Validation(
                        "offer amount must be greater than zero".into(),
                    ));
                }
            }
            _ => {
                if self.offer_amount.is_some() {
                    return Err(DomainError::Validation(
                        "only offers and counter-offers carry an amount".into(),
                    ));
                }
            }
        }

        match self.message_type {
            MessageType::Offer => {
                if self.sender_id == ctx.seller_id {
                    return Err(DomainError::NotAuthorized(
                        "sellers respond with counter-offers, not offers".into(),
                    ));
                }
                if !ctx.is_negotiable {
                    return Err(DomainError::InvalidState(
                        "listing is not negotiable".into(),
                    ));
                }
            }
            MessageType::CounterOffer => {
                if self.parent_offer_id.is_none() {
                    return Err(DomainError::Validation(
                        "counter-offer must reference the offer it answers".into(),
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }
}

/// The message facts a resolution is validated against
#[derive(Debug, Clone)]
pub struct MessageView {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub marked_received: bool,
}

/// Only the recipient resolves a pending offer; resolving twice is an error,
/// never a silent no-op.
pub fn ensure_resolvable(msg: &MessageView, actor: UserId) -> DomainResult<()> {
    if !msg.message_type.carries_amount() {
        return Err(DomainError::InvalidState(
            "only offers and counter-offers can be accepted or rejected".into(),
        ));
    }
    if msg.recipient_id != actor {
        return Err(DomainError::NotAuthorized(
            "only the offer's recipient can resolve it".into(),
        ));
    }
    if msg.status.is_resolved() {
        return Err(DomainError::InvalidState(format!(
            "offer is already {}",
            msg.status
        )));
    }
    Ok(())
}

/// Only the sender withdraws a pending offer
pub fn ensure_withdrawable(msg: &MessageView, actor: UserId) -> DomainResult<()> {
    if !msg.message_type.carries_amount() {
        return Err(DomainError::InvalidState(
            "only offers and counter-offers can be withdrawn".into(),
        ));
    }
    if msg.sender_id != actor {
        return Err(DomainError::NotAuthorized(
            "only the offer's sender can withdraw it".into(),
        ));
    }
    if msg.status.is_resolved() {
        return Err(DomainError::InvalidState(format!(
            "offer is already {}",
            msg.status
        )));
    }
    Ok(())
}

/// The buyer (sender of the accepted offer) confirms receipt once
pub fn ensure_receivable(msg: &MessageView, actor: UserId) -> DomainResult<()> {
    if msg.status != MessageStatus::Accepted {
        return Err(DomainError::InvalidState(
            "only an accepted offer can be marked as received".into(),
        ));
    }
    if msg.sender_id != actor {
        return Err(DomainError::NotAuthorized(
            "only the buyer can confirm receipt".into(),
        ));
    }
    if msg.marked_received {
        return Err(DomainError::InvalidState(
            "offer is already marked as received".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> OfferContext {
        OfferContext {
            seller_id: UserId::new(),
            status: ListingStatus::Approved,
            is_negotiable: true,
        }
    }

    fn offer(sender: UserId, recipient: UserId) -> NewOffer {
        NewOffer {
            sender_id: sender,
            recipient_id: recipient,
            message_type: MessageType::Offer,
            content: "Would you take 40?".to_string(),
            offer_amount: Some(dec!(40)),
            parent_offer_id: None,
        }
    }

    #[test]
    fn test_buyer_offer_ok() {
        let ctx = ctx();
        let buyer = UserId::new();
        assert!(offer(buyer, ctx.seller_id).validate(&ctx).is_ok());
    }

    #[test]
    fn test_self_dealing_rejected() {
        let ctx = ctx();
        let me = UserId::new();
        let err = offer(me, me).validate(&ctx).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_seller_cannot_open_with_offer() {
        let ctx = ctx();
        let buyer = UserId::new();
        let err = offer(ctx.seller_id, buyer).validate(&ctx).unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized(_)));
    }

    #[test]
    fn test_seller_counter_requires_parent() {
        let ctx = ctx();
        let buyer = UserId::new();
        let mut counter = offer(ctx.seller_id, buyer);
        counter.message_type = MessageType::CounterOffer;
        assert!(counter.validate(&ctx).is_err());

        counter.parent_offer_id = Some(MessageId::new());
        assert!(counter.validate(&ctx).is_ok());
    }

    #[test]
    fn test_non_negotiable_refuses_offers() {
        let mut ctx = ctx();
        ctx.is_negotiable = false;
        let buyer = UserId::new();
        let err = offer(buyer, ctx.seller_id).validate(&ctx).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        // Plain messages still flow
        let mut msg = offer(buyer, ctx.seller_id);
        msg.message_type = MessageType::Message;
        msg.offer_amount = None;
        assert!(msg.validate(&ctx).is_ok());
    }

    #[test]
    fn test_sold_listing_refuses_offers() {
        let mut ctx = ctx();
        ctx.status = ListingStatus::Sold;
        let buyer = UserId::new();
        assert!(offer(buyer, ctx.seller_id).validate(&ctx).is_err());
    }

    #[test]
    fn test_amount_must_be_positive() {
        let ctx = ctx();
        let buyer = UserId::new();
        let mut o = offer(buyer, ctx.seller_id);
        o.offer_amount = Some(dec!(0));
        assert!(o.validate(&ctx).is_err());
        o.offer_amount = None;
        assert!(o.validate(&ctx).is_err());
    }

    fn view(status: MessageStatus) -> MessageView {
        MessageView {
            id: MessageId::new(),
            sender_id: UserId::new(),
            recipient_id: UserId::new(),
            message_type: MessageType::Offer,
            status,
            marked_received: false,
        }
    }

    #[test]
    fn test_only_recipient_resolves() {
        let msg = view(MessageStatus::Pending);
        assert!(ensure_resolvable(&msg, msg.recipient_id).is_ok());
        let err = ensure_resolvable(&msg, msg.sender_id).unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized(_)));
    }

    #[test]
    fn test_double_resolution_is_invalid_state() {
        let msg = view(MessageStatus::Accepted);
        let err = ensure_resolvable(&msg, msg.recipient_id).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert!(err.to_string().contains("accepted"));
    }

    #[test]
    fn test_withdraw_is_sender_only() {
        let msg = view(MessageStatus::Pending);
        assert!(ensure_withdrawable(&msg, msg.sender_id).is_ok());
        assert!(ensure_withdrawable(&msg, msg.recipient_id).is_err());
    }

    #[test]
    fn test_receipt_confirmation() {
        let mut msg = view(MessageStatus::Accepted);
        assert!(ensure_receivable(&msg, msg.sender_id).is_ok());
        assert!(ensure_receivable(&msg, msg.recipient_id).is_err());

        msg.marked_received = true;
        assert!(ensure_receivable(&msg, msg.sender_id).is_err());

        let pending = view(MessageStatus::Pending);
        assert!(ensure_receivable(&pending, pending.sender_id).is_err());
    }
}
