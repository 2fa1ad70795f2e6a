//! Listing rules - moderation state machine, slug derivation, validation
//!
//! The source of truth for which moderation transitions are legal. Admin
//! overrides bypass the table through a dedicated operation and are audited
//! at the repo layer.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use clubmarket_types::{
    Category, Condition, DomainError, DomainResult, ListingId, ListingStatus,
    FLAG_REVIEW_THRESHOLD,
};

/// Legal moderation transitions. Anything not listed requires the admin
/// override path.
pub fn can_transition(from: ListingStatus, to: ListingStatus) -> bool {
    use ListingStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Pending, Rejected)
            | (Pending, Expired)
            | (Approved, Sold)
            | (Approved, Expired)
            | (Approved, FlaggedForReview)
            | (Approved, RemovedByFlags)
            | (FlaggedForReview, Restored)
            | (FlaggedForReview, RemovedByFlags)
            | (FlaggedForReview, Expired)
            | (Restored, Sold)
            | (Restored, Expired)
            | (Restored, FlaggedForReview)
            | (Restored, RemovedByFlags)
    )
}

/// Check a moderation transition, returning an actionable error
pub fn ensure_transition(from: ListingStatus, to: ListingStatus) -> DomainResult<()> {
    if can_transition(from, to) {
        return Ok(());
    }
    Err(DomainError::InvalidState(format!(
        "listing cannot move from {} to {}",
        from, to
    )))
}

/// Whether the given unresolved flag count pushes this status into review
pub fn flag_threshold_reached(status: ListingStatus, unresolved_flags: i32) -> bool {
    status.accepts_offers() && unresolved_flags >= FLAG_REVIEW_THRESHOLD
}

/// Derive a unique slug from a title and the listing id.
///
/// Lowercase/hyphenation is lossy and collides for similar titles, so the
/// first 8 hex chars of the id are appended as a uniqueness suffix.
pub fn slug_for(title: &str, id: ListingId) -> String {
    let mut slug = String::with_capacity(title.len() + 9);
    let mut last_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("listing");
    }
    let frag = id.as_uuid().simple().to_string();
    slug.push('-');
    slug.push_str(&frag[..8]);
    slug
}

/// Attributes supplied by a seller when creating a listing
#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub category: Category,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub condition: Condition,
    pub location: Option<String>,
    pub is_negotiable: bool,
    pub images: Vec<String>,
}

/// Listing images are capped per listing
pub const MAX_LISTING_IMAGES: usize = 5;

impl NewListing {
    /// Validate seller-supplied attributes. Status is never taken from the
    /// seller; creation always starts at pending.
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::Validation("title is required".into()));
        }
        if self.title.len() > 200 {
            return Err(DomainError::Validation("title exceeds 200 characters".into()));
        }
        if self.price < Decimal::ZERO {
            return Err(DomainError::Validation("price must not be negative".into()));
        }
        if self.images.is_empty() {
            return Err(DomainError::Validation("at least one image is required".into()));
        }
        if self.images.len() > MAX_LISTING_IMAGES {
            return Err(DomainError::Validation(format!(
                "at most {} images are allowed",
                MAX_LISTING_IMAGES
            )));
        }
        Ok(())
    }
}

/// Expiry timestamp for a new listing given the configured lifetime
pub fn expiry_from(now: DateTime<Utc>, expiration_days: i64) -> DateTime<Utc> {
    now + Duration::days(expiration_days)
}

/// Guard for extending a listing's expiration
pub fn ensure_extendable(
    status: ListingStatus,
    extension_count: i32,
    max_extensions: i32,
) -> DomainResult<()> {
    if !status.accepts_offers() {
        return Err(DomainError::InvalidState(format!(
            "listing cannot be extended while {}",
            status
        )));
    }
    if extension_count >= max_extensions {
        return Err(DomainError::InvalidState(
            "listing cannot be extended: maximum extensions reached".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn listing(title: &str) -> NewListing {
        NewListing {
            title: title.to_string(),
            description: "A fine pair of boots".to_string(),
            price: dec!(50),
            currency: "EUR".to_string(),
            category: Category::Footwear,
            subcategory: None,
            brand: Some("Nike".to_string()),
            size: Some("42".to_string()),
            color: None,
            condition: Condition::Good,
            location: None,
            is_negotiable: true,
            images: vec!["/media/boots-1.jpg".to_string()],
        }
    }

    #[test]
    fn test_transition_table() {
        use ListingStatus::*;
        assert!(can_transition(Pending, Approved));
        assert!(can_transition(Pending, Rejected));
        assert!(can_transition(Approved, Sold));
        assert!(can_transition(FlaggedForReview, Restored));
        assert!(can_transition(Restored, Sold));

        // Every status the expiry sweep touches has an edge to expired.
        assert!(can_transition(Pending, Expired));
        assert!(can_transition(Approved, Expired));
        assert!(can_transition(Restored, Expired));
        assert!(can_transition(FlaggedForReview, Expired));

        // The unconstrained any-to-any behavior of older systems is a bug
        // source; these must go through the admin override path instead.
        assert!(!can_transition(Rejected, Approved));
        assert!(!can_transition(Sold, Approved));
        assert!(!can_transition(Expired, Approved));
        assert!(!can_transition(Pending, Sold));
    }

    #[test]
    fn test_ensure_transition_message() {
        let err = ensure_transition(ListingStatus::Sold, ListingStatus::Approved).unwrap_err();
        assert!(err.to_string().contains("sold"));
    }

    #[test]
    fn test_flag_threshold() {
        assert!(!flag_threshold_reached(ListingStatus::Approved, 2));
        assert!(flag_threshold_reached(ListingStatus::Approved, 3));
        assert!(flag_threshold_reached(ListingStatus::Restored, 3));
        // Already-reviewed or pending listings never re-trip the threshold
        assert!(!flag_threshold_reached(ListingStatus::FlaggedForReview, 5));
        assert!(!flag_threshold_reached(ListingStatus::Pending, 5));
    }

    #[test]
    fn test_slug_derivation() {
        let id = ListingId::parse("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
        let slug = slug_for("Nike Mercurial Vapor 14", id);
        assert_eq!(slug, "nike-mercurial-vapor-14-6f9619ff");
    }

    #[test]
    fn test_slug_uniqueness_for_identical_titles() {
        let a = slug_for("Match Ball", ListingId::new());
        let b = slug_for("Match Ball", ListingId::new());
        assert_ne!(a, b);
        assert!(a.starts_with("match-ball-"));
    }

    #[test]
    fn test_slug_degenerate_title() {
        let slug = slug_for("!!!", ListingId::new());
        assert!(slug.starts_with("listing-"));
    }

    #[test]
    fn test_new_listing_validation() {
        assert!(listing("Boots").validate().is_ok());

        let mut bad = listing("Boots");
        bad.price = dec!(-1);
        assert!(bad.validate().is_err());

        let mut bad = listing("  ");
        bad.title = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = listing("Boots");
        bad.images.clear();
        assert!(bad.validate().is_err());

        let mut bad = listing("Boots");
        bad.images = (0..6).map(|i| format!("/media/{i}.jpg")).collect();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_extension_guard() {
        assert!(ensure_extendable(ListingStatus::Approved, 0, 3).is_ok());
        assert!(ensure_extendable(ListingStatus::Approved, 2, 3).is_ok());

        let err = ensure_extendable(ListingStatus::Approved, 3, 3).unwrap_err();
        assert!(err.to_string().contains("maximum extensions reached"));

        assert!(ensure_extendable(ListingStatus::Pending, 0, 3).is_err());
        assert!(ensure_extendable(ListingStatus::Sold, 0, 3).is_err());
    }
}
