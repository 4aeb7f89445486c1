//! Calendar-day mapping: instant + timezone → civil day key.
//!
//! All streak arithmetic happens in day-key space (whole civil days), never in
//! raw millisecond space, so daylight-saving transitions cannot distort day
//! counts.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use std::fmt;
use tracing::warn;

/// One civil day in some timezone.
///
/// Wraps a `NaiveDate` so day differences are exact calendar arithmetic. The
/// `Display` form is zero-padded `YYYY-MM-DD`, which makes lexicographic
/// order equal to chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// The previous calendar day.
    ///
    /// Used to anchor "yesterday" for current-streak validity. Computed in
    /// day-key space rather than by subtracting 24 wall-clock hours, which
    /// can land on the wrong day across daylight-saving transitions.
    pub fn pred(&self) -> CalendarDay {
        // NaiveDate::MIN is ~262000 BCE; unreachable for any real session.
        CalendarDay(self.0.pred_opt().unwrap_or(NaiveDate::MIN))
    }

    /// Whole days from `earlier` to `self` (positive when `self` is later).
    pub fn days_since(&self, earlier: &CalendarDay) -> i64 {
        self.0.signed_duration_since(earlier.0).num_days()
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

/// Map an instant to its calendar day in the given IANA timezone.
///
/// An unrecognized timezone identifier is not fatal: a user's stored
/// preference can go stale, and streak computation must stay available, so
/// the mapping degrades to UTC with a logged warning.
pub fn day_key(instant: DateTime<Utc>, timezone: &str) -> CalendarDay {
    match timezone.parse::<Tz>() {
        Ok(tz) => CalendarDay(instant.with_timezone(&tz).date_naive()),
        Err(_) => {
            warn!(timezone, "unrecognized timezone identifier — using UTC");
            CalendarDay(instant.date_naive())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_day_key_is_local_day_not_utc_day() {
        // 03:00 UTC on Jun 15 is still Jun 14 in Los Angeles (UTC-7).
        let instant = utc(2024, 6, 15, 3, 0);
        assert_eq!(
            day_key(instant, "America/Los_Angeles").to_string(),
            "2024-06-14"
        );
        assert_eq!(day_key(instant, "UTC").to_string(), "2024-06-15");
    }

    #[test]
    fn test_same_civil_day_maps_to_same_key() {
        let morning = utc(2024, 6, 15, 14, 0); // 07:00 in LA
        let evening = utc(2024, 6, 16, 5, 0); // 22:00 in LA, same civil day
        assert_eq!(
            day_key(morning, "America/Los_Angeles"),
            day_key(evening, "America/Los_Angeles")
        );
    }

    #[test]
    fn test_invalid_timezone_falls_back_to_utc() {
        let instant = utc(2024, 6, 15, 3, 0);
        assert_eq!(day_key(instant, "Not/A_Zone"), day_key(instant, "UTC"));
        assert_eq!(day_key(instant, ""), day_key(instant, "UTC"));
    }

    #[test]
    fn test_lexicographic_order_matches_chronological() {
        let a = day_key(utc(2024, 9, 30, 12, 0), "UTC");
        let b = day_key(utc(2024, 10, 1, 12, 0), "UTC");
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn test_days_since_whole_day_arithmetic() {
        let a = day_key(utc(2024, 3, 8, 12, 0), "UTC");
        let b = day_key(utc(2024, 3, 11, 12, 0), "UTC");
        assert_eq!(b.days_since(&a), 3);
        assert_eq!(a.days_since(&b), -3);
    }

    #[test]
    fn test_pred_crosses_month_and_dst() {
        let first = day_key(utc(2024, 3, 1, 12, 0), "UTC");
        assert_eq!(first.pred().to_string(), "2024-02-29");

        // US DST spring-forward was Mar 10 2024. "Yesterday" from Mar 11 in
        // day-key space is Mar 10, even though Mar 10 had only 23 wall hours.
        let after_dst = day_key(utc(2024, 3, 11, 20, 0), "America/New_York");
        assert_eq!(after_dst.pred().to_string(), "2024-03-10");
    }
}
