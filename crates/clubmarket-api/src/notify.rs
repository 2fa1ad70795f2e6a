//! Outbound notification collaborator
//!
//! Delivery is best-effort: a failed notification is logged and never rolls
//! back the state change that triggered it.

use async_trait::async_trait;
use uuid::Uuid;

/// Events the marketplace pushes to users
#[derive(Debug, Clone)]
pub enum Notification {
    OfferReceived { item_id: Uuid, message_id: Uuid },
    OfferAccepted { item_id: Uuid, message_id: Uuid },
    OfferRejected { item_id: Uuid, message_id: Uuid },
    ListingFlagged { item_id: Uuid },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: Uuid, event: Notification) -> Result<(), String>;
}

/// Fallback notifier that only logs. Real delivery channels (email, push)
/// plug in behind the same trait.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: Uuid, event: Notification) -> Result<(), String> {
        tracing::info!(recipient = %recipient, event = ?event, "notification");
        Ok(())
    }
}

/// Dispatch and swallow failures, logging them.
pub async fn dispatch(notifier: &dyn Notifier, recipient: Uuid, event: Notification) {
    if let Err(e) = notifier.notify(recipient, event).await {
        tracing::warn!(recipient = %recipient, error = %e, "notification delivery failed");
    }
}
