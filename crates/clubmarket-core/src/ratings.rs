//! Rating rules and aggregate math

use clubmarket_types::{DomainError, DomainResult};

/// Maximum length of a rating comment
pub const MAX_RATING_COMMENT: usize = 500;

/// Ratings are integers in [1, 5]
pub fn validate_rating(rating: i32, comment: Option<&str>) -> DomainResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(DomainError::Validation(
            "rating must be an integer between 1 and 5".into(),
        ));
    }
    if let Some(c) = comment {
        if c.len() > MAX_RATING_COMMENT {
            return Err(DomainError::Validation(format!(
                "comment exceeds {} characters",
                MAX_RATING_COMMENT
            )));
        }
    }
    Ok(())
}

/// Rolling average from the persisted sum and count
pub fn average(rating_sum: i64, rating_count: i64) -> Option<f64> {
    if rating_count == 0 {
        return None;
    }
    Some(rating_sum as f64 / rating_count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        for r in 1..=5 {
            assert!(validate_rating(r, None).is_ok());
        }
        assert!(validate_rating(0, None).is_err());
        assert!(validate_rating(6, None).is_err());
        assert!(validate_rating(-1, None).is_err());
    }

    #[test]
    fn test_comment_length() {
        let ok = "x".repeat(500);
        assert!(validate_rating(5, Some(&ok)).is_ok());
        let long = "x".repeat(501);
        assert!(validate_rating(5, Some(&long)).is_err());
    }

    #[test]
    fn test_average() {
        assert_eq!(average(0, 0), None);
        assert_eq!(average(9, 2), Some(4.5));
        assert_eq!(average(5, 1), Some(5.0));
    }
}
