//! Achievement engine: evaluates catalog criteria against live aggregates and
//! performs idempotent grants.
//!
//! Concurrency model: multiple workers (or daemon instances) may run
//! `check_and_award` for the same user at once. There is no in-process lock;
//! the grant ledger's uniqueness constraint is the sole arbiter, and losing
//! that race is a normal outcome.

use crate::error::ServiceError;
use crate::storage::{AchievementRow, GrantOutcome, Storage};
use crate::streaks;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Machine-checkable unlock condition attached to a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    SessionCount,
    Streak,
    FocusTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub kind: CriterionKind,
    pub threshold: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Criterion {
    /// Threshold in minutes for `focus_time` criteria. Stored thresholds are
    /// minutes unless the unit says hours.
    fn threshold_minutes(&self) -> i64 {
        match self.unit.as_deref() {
            Some("hours") => self.threshold * 60,
            _ => self.threshold,
        }
    }
}

/// Seed the achievement catalog. Idempotent — existing names are left alone,
/// so definitions are immutable after first creation.
pub async fn seed_catalog(storage: &Storage) -> anyhow::Result<()> {
    let defs = [
        (
            "First Focus",
            "Complete your first focus session",
            Criterion {
                kind: CriterionKind::SessionCount,
                threshold: 1,
                unit: None,
            },
        ),
        (
            "Week Warrior",
            "Maintain a 7-day activity streak",
            Criterion {
                kind: CriterionKind::Streak,
                threshold: 7,
                unit: None,
            },
        ),
        (
            "Dedicated Learner",
            "Accumulate 25 hours of total focus time",
            Criterion {
                kind: CriterionKind::FocusTime,
                threshold: 1500,
                unit: Some("minutes".to_string()),
            },
        ),
    ];
    for (name, description, criterion) in defs {
        let json = serde_json::to_string(&criterion)?;
        storage.seed_achievement(name, description, None, &json).await?;
    }
    Ok(())
}

/// Evaluate every catalog entry for `user_id` and grant the ones newly
/// satisfied. Returns the newly granted achievement names in catalog order.
///
/// A failure on one achievement is logged and does not abort the rest;
/// only a failure to read the catalog itself propagates.
pub async fn check_and_award(
    storage: &Storage,
    user_id: &str,
) -> Result<Vec<String>, ServiceError> {
    let catalog = storage.list_achievements().await?;
    let mut granted = Vec::new();

    for def in &catalog {
        match evaluate_one(storage, user_id, def).await {
            Ok(true) => {
                info!(user_id, achievement = %def.name, "achievement unlocked");
                granted.push(def.name.clone());
            }
            Ok(false) => {}
            Err(e) => {
                warn!(user_id, achievement = %def.name, err = %e,
                      "achievement evaluation failed — continuing with remaining catalog");
            }
        }
    }
    Ok(granted)
}

/// Evaluate a single catalog entry. Returns `true` iff this call produced a
/// new grant.
async fn evaluate_one(
    storage: &Storage,
    user_id: &str,
    def: &AchievementRow,
) -> anyhow::Result<bool> {
    // Idempotency fast path: holders skip threshold recomputation entirely.
    if storage.has_grant(user_id, &def.id).await? {
        return Ok(false);
    }

    let criterion: Criterion = serde_json::from_str(&def.criterion)
        .map_err(|e| anyhow::anyhow!("malformed criterion for '{}': {e}", def.name))?;

    let satisfied = match criterion.kind {
        CriterionKind::SessionCount => {
            storage.completed_session_count(user_id).await? >= criterion.threshold
        }
        CriterionKind::Streak => {
            let info = streaks::streak_for_user(storage, user_id)
                .await
                .map_err(|e| anyhow::anyhow!("streak computation failed: {e}"))?;
            i64::from(info.current_streak) >= criterion.threshold
        }
        CriterionKind::FocusTime => {
            storage.total_completed_minutes(user_id).await? >= criterion.threshold_minutes()
        }
    };
    if !satisfied {
        return Ok(false);
    }

    // A lost uniqueness race means a concurrent check granted it first —
    // report nothing new.
    match storage.try_grant(user_id, &def.id).await? {
        GrantOutcome::Granted(_) => Ok(true),
        GrantOutcome::AlreadyGranted => Ok(false),
    }
}

// ─── Read-only projections ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AchievementView {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub is_unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<String>,
}

/// Full catalog with this user's unlock status.
pub async fn list_for_user(
    storage: &Storage,
    user_id: &str,
) -> Result<Vec<AchievementView>, ServiceError> {
    let rows = storage.achievements_with_unlock_status(user_id).await?;
    Ok(rows
        .into_iter()
        .map(|r| AchievementView {
            id: r.id,
            name: r.name,
            description: r.description,
            icon_url: r.icon_url,
            is_unlocked: r.unlocked_at.is_some(),
            unlocked_at: r.unlocked_at,
        })
        .collect())
}

/// Only the achievements this user has unlocked, newest first.
pub async fn list_unlocked(
    storage: &Storage,
    user_id: &str,
) -> Result<Vec<AchievementView>, ServiceError> {
    let rows = storage.unlocked_achievements(user_id).await?;
    Ok(rows
        .into_iter()
        .map(|r| AchievementView {
            id: r.id,
            name: r.name,
            description: r.description,
            icon_url: r.icon_url,
            is_unlocked: true,
            unlocked_at: r.unlocked_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_json_shape() {
        let c: Criterion = serde_json::from_str(r#"{"kind":"streak","threshold":7}"#).unwrap();
        assert_eq!(c.kind, CriterionKind::Streak);
        assert_eq!(c.threshold, 7);
        assert!(c.unit.is_none());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let res: Result<Criterion, _> =
            serde_json::from_str(r#"{"kind":"coffee_count","threshold":3}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_focus_time_unit_normalization() {
        let minutes = Criterion {
            kind: CriterionKind::FocusTime,
            threshold: 1500,
            unit: Some("minutes".to_string()),
        };
        assert_eq!(minutes.threshold_minutes(), 1500);

        let hours = Criterion {
            kind: CriterionKind::FocusTime,
            threshold: 25,
            unit: Some("hours".to_string()),
        };
        assert_eq!(hours.threshold_minutes(), 1500);

        let bare = Criterion {
            kind: CriterionKind::FocusTime,
            threshold: 90,
            unit: None,
        };
        assert_eq!(bare.threshold_minutes(), 90);
    }
}
