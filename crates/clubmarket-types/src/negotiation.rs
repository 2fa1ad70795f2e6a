//! Negotiation message enums

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a negotiation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    Offer,
    CounterOffer,
    Accept,
    Reject,
    Withdraw,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Message => "message",
            MessageType::Offer => "offer",
            MessageType::CounterOffer => "counter_offer",
            MessageType::Accept => "accept",
            MessageType::Reject => "reject",
            MessageType::Withdraw => "withdraw",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(MessageType::Message),
            "offer" => Some(MessageType::Offer),
            "counter_offer" => Some(MessageType::CounterOffer),
            "accept" => Some(MessageType::Accept),
            "reject" => Some(MessageType::Reject),
            "withdraw" => Some(MessageType::Withdraw),
            _ => None,
        }
    }

    /// Offers and counter-offers carry an amount and participate in the
    /// accept/reject lifecycle.
    pub fn carries_amount(&self) -> bool {
        matches!(self, MessageType::Offer | MessageType::CounterOffer)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution state of a negotiation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Withdrawn,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Accepted => "accepted",
            MessageStatus::Rejected => "rejected",
            MessageStatus::Expired => "expired",
            MessageStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MessageStatus::Pending),
            "accepted" => Some(MessageStatus::Accepted),
            "rejected" => Some(MessageStatus::Rejected),
            "expired" => Some(MessageStatus::Expired),
            "withdrawn" => Some(MessageStatus::Withdrawn),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, MessageStatus::Pending)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum length of message content
pub const MAX_MESSAGE_CONTENT: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        for ty in [
            MessageType::Message,
            MessageType::Offer,
            MessageType::CounterOffer,
            MessageType::Accept,
            MessageType::Reject,
            MessageType::Withdraw,
        ] {
            assert_eq!(MessageType::parse(ty.as_str()), Some(ty));
        }
    }

    #[test]
    fn test_carries_amount() {
        assert!(MessageType::Offer.carries_amount());
        assert!(MessageType::CounterOffer.carries_amount());
        assert!(!MessageType::Message.carries_amount());
    }

    #[test]
    fn test_resolution() {
        assert!(!MessageStatus::Pending.is_resolved());
        assert!(MessageStatus::Accepted.is_resolved());
        assert!(MessageStatus::Withdrawn.is_resolved());
    }
}
