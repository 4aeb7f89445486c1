//! Streak engine: completed-session start instants → consecutive-day streaks.
//!
//! Purely computational — no shared mutable state, safe to call concurrently.
//! Results are recomputed fresh from the full completed-session history on
//! every call and never persisted.

pub mod calendar;

use crate::error::ServiceError;
use crate::storage::Storage;
use calendar::{day_key, CalendarDay};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakInfo {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Start instant of the most recent completed session (not a day key).
    pub last_active_date: Option<DateTime<Utc>>,
}

impl StreakInfo {
    fn empty() -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
        }
    }
}

/// Compute streaks for a user from the session store.
///
/// A missing user profile degrades to UTC rather than failing — a streak
/// must remain computable even when the timezone preference is unresolvable.
pub async fn streak_for_user(storage: &Storage, user_id: &str) -> Result<StreakInfo, ServiceError> {
    let timezone = storage
        .get_user(user_id)
        .await?
        .map(|u| u.timezone)
        .unwrap_or_else(|| "UTC".to_string());
    let timestamps = storage.completed_session_start_times(user_id).await?;
    Ok(compute_streak(&timestamps, &timezone))
}

/// Compute current/longest streaks from completed-session start instants,
/// evaluated against the current wall clock.
pub fn compute_streak(timestamps: &[DateTime<Utc>], timezone: &str) -> StreakInfo {
    compute_streak_at(timestamps, timezone, Utc::now())
}

/// Streak computation with an explicit evaluation instant.
///
/// Algorithm: collapse instants to a set of distinct calendar days in the
/// user's timezone, sort descending, then
///   - current streak: valid only if the most recent active day is today or
///     yesterday (both in the user's timezone); walk until the first gap;
///   - longest streak: one pass over the whole list, independent of anchoring.
pub fn compute_streak_at(
    timestamps: &[DateTime<Utc>],
    timezone: &str,
    now: DateTime<Utc>,
) -> StreakInfo {
    if timestamps.is_empty() {
        return StreakInfo::empty();
    }

    // Multiple sessions on one civil day collapse to one active day.
    let mut days: Vec<CalendarDay> = timestamps
        .iter()
        .map(|ts| day_key(*ts, timezone))
        .collect();
    days.sort_unstable();
    days.dedup();
    days.reverse(); // most recent first

    let today = day_key(now, timezone);
    let yesterday = today.pred();

    let mut current_streak = 0u32;
    if days[0] == today || days[0] == yesterday {
        current_streak = 1;
        for pair in days.windows(2) {
            if pair[0].days_since(&pair[1]) == 1 {
                current_streak += 1;
            } else {
                break;
            }
        }
    }

    let mut longest_streak = 1u32;
    let mut run = 1u32;
    for pair in days.windows(2) {
        if pair[0].days_since(&pair[1]) == 1 {
            run += 1;
            longest_streak = longest_streak.max(run);
        } else {
            run = 1;
        }
    }

    StreakInfo {
        current_streak,
        longest_streak,
        last_active_date: timestamps.iter().max().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn eval_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    /// A session start `days` days before the evaluation instant.
    fn days_ago(days: i64) -> DateTime<Utc> {
        eval_at() - Duration::days(days)
    }

    #[test]
    fn test_no_sessions_yields_zero() {
        let info = compute_streak_at(&[], "UTC", eval_at());
        assert_eq!(info.current_streak, 0);
        assert_eq!(info.longest_streak, 0);
        assert_eq!(info.last_active_date, None);
    }

    #[test]
    fn test_three_consecutive_days_ending_today() {
        let ts = vec![days_ago(0), days_ago(1), days_ago(2)];
        let info = compute_streak_at(&ts, "UTC", eval_at());
        assert_eq!(info.current_streak, 3);
        assert_eq!(info.longest_streak, 3);
        assert_eq!(info.last_active_date, Some(days_ago(0)));
    }

    #[test]
    fn test_gap_stops_current_streak() {
        // Active on D, D-1, D-3: the D-3 day is across a gap.
        let ts = vec![days_ago(0), days_ago(1), days_ago(3)];
        let info = compute_streak_at(&ts, "UTC", eval_at());
        assert_eq!(info.current_streak, 2);
        assert_eq!(info.longest_streak, 2);
    }

    #[test]
    fn test_stale_activity_goes_cold() {
        // Only activity was three days ago — current streak is dead.
        let ts = vec![days_ago(3)];
        let info = compute_streak_at(&ts, "UTC", eval_at());
        assert_eq!(info.current_streak, 0);
        assert_eq!(info.longest_streak, 1);
    }

    #[test]
    fn test_yesterday_anchors_current_streak() {
        // No session today yet: a run ending yesterday still counts.
        let ts = vec![days_ago(1), days_ago(2)];
        let info = compute_streak_at(&ts, "UTC", eval_at());
        assert_eq!(info.current_streak, 2);
    }

    #[test]
    fn test_same_day_sessions_collapse() {
        let ts = vec![days_ago(0), days_ago(0) + Duration::hours(3)];
        let info = compute_streak_at(&ts, "UTC", eval_at());
        assert_eq!(info.current_streak, 1);
        assert_eq!(info.longest_streak, 1);
    }

    #[test]
    fn test_longest_streak_from_past_run() {
        // Five-day run two weeks ago, two-day run ending today.
        let mut ts: Vec<_> = (10..=14).map(days_ago).collect();
        ts.push(days_ago(0));
        ts.push(days_ago(1));
        let info = compute_streak_at(&ts, "UTC", eval_at());
        assert_eq!(info.current_streak, 2);
        assert_eq!(info.longest_streak, 5);
    }

    #[test]
    fn test_timezone_shifts_day_grouping() {
        // 03:00 UTC and 23:00 UTC the previous day are the same civil day in
        // Los Angeles but different days in UTC.
        let late = Utc.with_ymd_and_hms(2024, 6, 15, 3, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 6, 14, 23, 0, 0).unwrap();
        let info = compute_streak_at(&[late, earlier], "America/Los_Angeles", late);
        assert_eq!(info.current_streak, 1);
        let info_utc = compute_streak_at(&[late, earlier], "UTC", late);
        assert_eq!(info_utc.current_streak, 2);
    }

    #[test]
    fn test_invalid_timezone_still_computes() {
        let ts = vec![days_ago(0), days_ago(1)];
        let info = compute_streak_at(&ts, "Mars/Olympus_Mons", eval_at());
        assert_eq!(info.current_streak, 2);
    }

    #[test]
    fn test_dst_transition_does_not_break_run() {
        // US spring-forward: Sun Mar 10 2024 had 23 wall hours in New York.
        // Sessions on Mar 9, 10, 11 (local evenings) must count as three
        // consecutive days.
        let tz = "America/New_York";
        let ts: Vec<_> = (9..=11)
            .map(|d| Utc.with_ymd_and_hms(2024, 3, d, 23, 30, 0).unwrap())
            .collect();
        let now = Utc.with_ymd_and_hms(2024, 3, 12, 1, 0, 0).unwrap(); // Mar 11 evening in NY
        let info = compute_streak_at(&ts, tz, now);
        assert_eq!(info.current_streak, 3);
        assert_eq!(info.longest_streak, 3);
    }

    proptest! {
        /// Whenever a current streak exists, it can never exceed the longest.
        #[test]
        fn prop_longest_at_least_current(offsets in proptest::collection::hash_set(0i64..60, 1..40)) {
            let ts: Vec<_> = offsets.iter().map(|&d| days_ago(d)).collect();
            let info = compute_streak_at(&ts, "UTC", eval_at());
            if info.current_streak > 0 {
                prop_assert!(info.longest_streak >= info.current_streak);
            }
        }

        /// The longest streak does not depend on whether the most recent run
        /// touches "today" — shifting the evaluation instant far into the
        /// future kills the current streak but must not change the longest.
        #[test]
        fn prop_longest_is_anchor_independent(offsets in proptest::collection::hash_set(0i64..60, 1..40)) {
            let ts: Vec<_> = offsets.iter().map(|&d| days_ago(d)).collect();
            let anchored = compute_streak_at(&ts, "UTC", eval_at());
            let cold = compute_streak_at(&ts, "UTC", eval_at() + Duration::days(365));
            prop_assert_eq!(anchored.longest_streak, cold.longest_streak);
            prop_assert_eq!(cold.current_streak, 0);
        }
    }
}
