//! Request handlers

pub mod admin;
pub mod fees;
pub mod health;
pub mod listing;
pub mod message;
pub mod payment;
pub mod rating;

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Start of the current calendar month, the window free-tier usage is
/// counted over.
pub(crate) fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_start() {
        let now = Utc.with_ymd_and_hms(2025, 3, 17, 13, 45, 12).single().unwrap();
        let start = month_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).single().unwrap());
    }
}
