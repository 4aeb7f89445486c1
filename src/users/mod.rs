//! User profile projection and settings.

use crate::error::ServiceError;
use crate::storage::Storage;
use crate::streaks;
use serde::Serialize;

/// Profile with derived statistics — everything the dashboard shows about
/// one user.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub timezone: String,
    /// Total completed focus time in minutes.
    pub total_focus_time: i64,
    pub completed_sessions: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub achievement_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn get_profile(storage: &Storage, user_id: &str) -> Result<UserProfile, ServiceError> {
    let user = storage
        .get_user(user_id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;

    let timestamps = storage.completed_session_start_times(user_id).await?;
    let streak = streaks::compute_streak(&timestamps, &user.timezone);
    let total_focus_time = storage.total_completed_minutes(user_id).await?;
    let achievement_count = storage.grant_count(user_id).await?;

    Ok(UserProfile {
        id: user.id,
        email: user.email,
        timezone: user.timezone,
        total_focus_time,
        completed_sessions: timestamps.len() as i64,
        current_streak: streak.current_streak,
        longest_streak: streak.longest_streak,
        achievement_count,
        created_at: user.created_at,
        updated_at: user.updated_at,
    })
}

/// Update the stored timezone preference. The identifier is not validated
/// here — streak computation degrades to UTC if it turns out to be garbage,
/// but rejecting obvious junk early keeps profiles tidy.
pub async fn update_timezone(
    storage: &Storage,
    user_id: &str,
    timezone: &str,
) -> Result<UserProfile, ServiceError> {
    let timezone = timezone.trim();
    if timezone.is_empty() {
        return Err(ServiceError::Validation("timezone must not be empty".into()));
    }
    storage
        .get_user(user_id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    storage.update_user_timezone(user_id, timezone).await?;
    get_profile(storage, user_id).await
}

/// Delete the account and every owned row (cascade).
pub async fn delete_account(storage: &Storage, user_id: &str) -> Result<(), ServiceError> {
    storage
        .get_user(user_id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    storage.delete_user(user_id).await?;
    Ok(())
}
