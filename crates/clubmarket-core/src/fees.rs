//! Fee schedule and the cached fee configuration service
//!
//! One configuration version is active at a time. `FeeService` caches the
//! active version behind a lock; writers install a new version after
//! persisting it, readers never touch the database.
//!
//! Percentage mode exists in the schema for historical rows but the
//! per-action calculators cannot price it (they do not receive the item
//! price), so it surfaces as `Unsupported` rather than a guessed amount.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clubmarket_types::{DomainError, DomainResult, FeeConfigId, FeeType, UserId};

/// One version of the global fee configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub id: FeeConfigId,
    pub posting_fee: Decimal,
    pub extension_fee: Decimal,
    pub featured_fee: Decimal,
    pub premium_fee: Decimal,
    pub fee_type: FeeType,
    pub default_expiration_days: i32,
    pub extension_days: i32,
    pub max_extensions: i32,
    pub free_posting_limit: i32,
    pub free_extension_limit: i32,
    pub currency: String,
    pub effective_date: DateTime<Utc>,
    pub created_by: Option<UserId>,
}

impl FeeSchedule {
    /// Validate a schedule before it becomes the active version
    pub fn validate(&self) -> DomainResult<()> {
        for (name, fee) in [
            ("posting_fee", self.posting_fee),
            ("extension_fee", self.extension_fee),
            ("featured_fee", self.featured_fee),
            ("premium_fee", self.premium_fee),
        ] {
            if fee < Decimal::ZERO {
                return Err(DomainError::Validation(format!(
                    "{} must not be negative",
                    name
                )));
            }
        }
        if self.default_expiration_days <= 0 || self.extension_days <= 0 {
            return Err(DomainError::Validation(
                "expiration and extension days must be positive".into(),
            ));
        }
        if self.max_extensions < 0 || self.free_posting_limit < 0 || self.free_extension_limit < 0 {
            return Err(DomainError::Validation(
                "limits must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Posting fee for a user who has already posted `posts_this_month` times
    pub fn posting_fee_for(&self, posts_this_month: i64) -> DomainResult<Decimal> {
        self.fixed_only()?;
        if posts_this_month < self.free_posting_limit as i64 {
            return Ok(Decimal::ZERO);
        }
        Ok(self.posting_fee)
    }

    /// Extension fee for a user who has already extended `extensions_this_month` times
    pub fn extension_fee_for(&self, extensions_this_month: i64) -> DomainResult<Decimal> {
        self.fixed_only()?;
        if extensions_this_month < self.free_extension_limit as i64 {
            return Ok(Decimal::ZERO);
        }
        Ok(self.extension_fee)
    }

    fn fixed_only(&self) -> DomainResult<()> {
        match self.fee_type {
            FeeType::Fixed => Ok(()),
            FeeType::Percentage => Err(DomainError::Unsupported(
                "percentage fees need the item price and are not computed here".into(),
            )),
        }
    }
}

/// Injected configuration service holding the single active schedule.
///
/// The active row is read far more than written; reads share the lock,
/// installs replace the snapshot wholesale.
#[derive(Debug, Default)]
pub struct FeeService {
    active: RwLock<Option<FeeSchedule>>,
}

impl FeeService {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// Seed or replace the cached active schedule (called after the DB row
    /// flips, and once at boot)
    pub fn install(&self, schedule: FeeSchedule) {
        *self.active.write() = Some(schedule);
    }

    /// Drop the cached schedule (all active rows deactivated)
    pub fn clear(&self) {
        *self.active.write() = None;
    }

    /// The active schedule, or `NotConfigured` - never a default of zero
    pub fn current(&self) -> DomainResult<FeeSchedule> {
        self.active
            .read()
            .clone()
            .ok_or(DomainError::NotConfigured)
    }

    /// Id of the active version, if any
    pub fn active_id(&self) -> Option<FeeConfigId> {
        self.active.read().as_ref().map(|s| s.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn schedule() -> FeeSchedule {
        FeeSchedule {
            id: FeeConfigId::new(),
            posting_fee: dec!(2.50),
            extension_fee: dec!(1.00),
            featured_fee: dec!(5.00),
            premium_fee: dec!(10.00),
            fee_type: FeeType::Fixed,
            default_expiration_days: 90,
            extension_days: 30,
            max_extensions: 3,
            free_posting_limit: 3,
            free_extension_limit: 1,
            currency: "EUR".to_string(),
            effective_date: Utc::now(),
            created_by: None,
        }
    }

    #[test]
    fn test_free_tier_posting() {
        let s = schedule();
        // 2 posts so far, limit 3: the 3rd post is free
        assert_eq!(s.posting_fee_for(2).unwrap(), Decimal::ZERO);
        // 3 posts so far: the 4th is charged
        assert_eq!(s.posting_fee_for(3).unwrap(), dec!(2.50));
        assert_eq!(s.posting_fee_for(10).unwrap(), dec!(2.50));
    }

    #[test]
    fn test_free_tier_extension() {
        let s = schedule();
        assert_eq!(s.extension_fee_for(0).unwrap(), Decimal::ZERO);
        assert_eq!(s.extension_fee_for(1).unwrap(), dec!(1.00));
    }

    #[test]
    fn test_percentage_mode_unsupported() {
        let mut s = schedule();
        s.fee_type = FeeType::Percentage;
        assert!(matches!(
            s.posting_fee_for(5),
            Err(DomainError::Unsupported(_))
        ));
        assert!(matches!(
            s.extension_fee_for(5),
            Err(DomainError::Unsupported(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut s = schedule();
        s.posting_fee = dec!(-1);
        assert!(s.validate().is_err());

        let mut s = schedule();
        s.extension_days = 0;
        assert!(s.validate().is_err());

        assert!(schedule().validate().is_ok());
    }

    #[test]
    fn test_service_not_configured() {
        let svc = FeeService::new();
        assert!(matches!(svc.current(), Err(DomainError::NotConfigured)));
        assert!(svc.active_id().is_none());
    }

    #[test]
    fn test_service_install_and_clear() {
        let svc = FeeService::new();
        let s = schedule();
        let id = s.id;
        svc.install(s);
        assert_eq!(svc.active_id(), Some(id));
        assert_eq!(svc.current().unwrap().posting_fee, dec!(2.50));

        svc.clear();
        assert!(svc.current().is_err());
    }

    #[test]
    fn test_install_replaces_version() {
        let svc = FeeService::new();
        svc.install(schedule());
        let mut next = schedule();
        next.posting_fee = dec!(4.00);
        let next_id = next.id;
        svc.install(next);
        assert_eq!(svc.active_id(), Some(next_id));
        assert_eq!(svc.current().unwrap().posting_fee, dec!(4.00));
    }
}
