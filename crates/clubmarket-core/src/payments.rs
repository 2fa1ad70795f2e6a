//! Payment intent lifecycle guards
//!
//! A payment intent is pending for at most 24 hours. Completion past the
//! window is refused; the user recreates the intent. Refunds require a
//! completed, not-yet-refunded payment and never exceed the original amount.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use clubmarket_types::{DomainError, DomainResult, PaymentStatus, PAYMENT_INTENT_TTL_HOURS};

/// Expiry for a new payment intent
pub fn intent_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(PAYMENT_INTENT_TTL_HOURS)
}

/// Guard for completing a pending payment
pub fn ensure_completable(
    status: PaymentStatus,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DomainResult<()> {
    match status {
        PaymentStatus::Pending => {}
        other => {
            return Err(DomainError::InvalidState(format!(
                "payment is already {}",
                other
            )))
        }
    }
    if now >= expires_at {
        return Err(DomainError::Expired(
            "payment intent has expired; create a new one".into(),
        ));
    }
    Ok(())
}

/// Guard for refunding a completed payment
pub fn ensure_refundable(
    status: PaymentStatus,
    already_refunded: bool,
    original_amount: Decimal,
    refund_amount: Decimal,
) -> DomainResult<()> {
    if status != PaymentStatus::Completed {
        return Err(DomainError::InvalidState(format!(
            "only completed payments can be refunded (payment is {})",
            status
        )));
    }
    if already_refunded {
        return Err(DomainError::InvalidState(
            "payment has already been refunded".into(),
        ));
    }
    if refund_amount <= Decimal::ZERO {
        return Err(DomainError::Validation(
            "refund amount must be greater than zero".into(),
        ));
    }
    if refund_amount > original_amount {
        return Err(DomainError::Validation(
            "refund amount exceeds the original payment".into(),
        ));
    }
    Ok(())
}

/// Guard for cancelling a pending payment
pub fn ensure_cancellable(status: PaymentStatus) -> DomainResult<()> {
    if status != PaymentStatus::Pending {
        return Err(DomainError::InvalidState(format!(
            "only pending payments can be cancelled (payment is {})",
            status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_intent_expiry_window() {
        let now = Utc::now();
        assert_eq!(intent_expiry(now), now + Duration::hours(24));
    }

    #[test]
    fn test_complete_pending_within_window() {
        let now = Utc::now();
        assert!(ensure_completable(PaymentStatus::Pending, now + Duration::hours(1), now).is_ok());
    }

    #[test]
    fn test_complete_expired_rejected() {
        let now = Utc::now();
        let err =
            ensure_completable(PaymentStatus::Pending, now - Duration::minutes(1), now).unwrap_err();
        assert!(matches!(err, DomainError::Expired(_)));
    }

    #[test]
    fn test_double_complete_is_invalid_state() {
        let now = Utc::now();
        let err =
            ensure_completable(PaymentStatus::Completed, now + Duration::hours(1), now).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn test_refund_rules() {
        assert!(ensure_refundable(PaymentStatus::Completed, false, dec!(10), dec!(10)).is_ok());
        assert!(ensure_refundable(PaymentStatus::Completed, false, dec!(10), dec!(5)).is_ok());

        // Partial over original
        assert!(ensure_refundable(PaymentStatus::Completed, false, dec!(10), dec!(11)).is_err());
        // Already refunded
        assert!(ensure_refundable(PaymentStatus::Completed, true, dec!(10), dec!(5)).is_err());
        // Not completed
        assert!(ensure_refundable(PaymentStatus::Pending, false, dec!(10), dec!(5)).is_err());
        // Zero refund
        assert!(ensure_refundable(PaymentStatus::Completed, false, dec!(10), dec!(0)).is_err());
    }

    #[test]
    fn test_cancel_rules() {
        assert!(ensure_cancellable(PaymentStatus::Pending).is_ok());
        assert!(ensure_cancellable(PaymentStatus::Completed).is_err());
        assert!(ensure_cancellable(PaymentStatus::Cancelled).is_err());
    }
}
