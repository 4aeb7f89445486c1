//! Focus session lifecycle: start → complete | cancel.
//!
//! Completion triggers achievement checking on a detached task — it must
//! never delay or fail the completing request.

use crate::achievements;
use crate::error::ServiceError;
use crate::storage::{SessionRow, Storage};
use serde::Serialize;
use tracing::warn;

pub const MIN_DURATION_MINUTES: i64 = 1;
pub const MAX_DURATION_MINUTES: i64 = 120;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 100;

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// Start a session against a task the user owns.
pub async fn start_session(
    storage: &Storage,
    user_id: &str,
    task_id: &str,
    duration: i64,
) -> Result<SessionRow, ServiceError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
        return Err(ServiceError::Validation(format!(
            "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
        )));
    }
    let task = storage
        .get_task(task_id)
        .await?
        .ok_or(ServiceError::NotFound("task"))?;
    if task.user_id != user_id {
        return Err(ServiceError::Forbidden);
    }
    Ok(storage.create_session(user_id, task_id, duration).await?)
}

/// Complete an in-progress session, then kick off achievement checking in
/// the background.
pub async fn complete_session(
    storage: &Storage,
    session_id: &str,
    user_id: &str,
) -> Result<SessionRow, ServiceError> {
    let session = finish(storage, session_id, user_id, STATUS_COMPLETED).await?;

    // Fire-and-forget: the completing request must not wait on (or fail
    // because of) achievement evaluation. Errors are logged, not surfaced.
    let storage = storage.clone();
    let user_id = user_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = achievements::check_and_award(&storage, &user_id).await {
            warn!(user_id, err = %e, "post-completion achievement check failed");
        }
    });

    Ok(session)
}

/// Cancel an in-progress session. Cancelled sessions never count toward any
/// streak or achievement threshold, so no check is triggered.
pub async fn cancel_session(
    storage: &Storage,
    session_id: &str,
    user_id: &str,
) -> Result<SessionRow, ServiceError> {
    finish(storage, session_id, user_id, STATUS_CANCELLED).await
}

async fn finish(
    storage: &Storage,
    session_id: &str,
    user_id: &str,
    status: &str,
) -> Result<SessionRow, ServiceError> {
    let session = storage
        .get_session(session_id)
        .await?
        .ok_or(ServiceError::NotFound("session"))?;
    if session.user_id != user_id {
        return Err(ServiceError::Forbidden);
    }
    // The guarded UPDATE is the real arbiter; the ownership check above only
    // shapes the error. Losing the transition race means the session already
    // reached a terminal state.
    if !storage.finish_session(session_id, status).await? {
        return Err(ServiceError::InvalidState(
            "session is not in progress".to_string(),
        ));
    }
    storage
        .get_session(session_id)
        .await?
        .ok_or(ServiceError::NotFound("session"))
}

#[derive(Debug, Default)]
pub struct HistoryFilter {
    pub task_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated session history, newest first.
pub async fn session_history(
    storage: &Storage,
    user_id: &str,
    filter: HistoryFilter,
) -> Result<Vec<SessionRow>, ServiceError> {
    if let Some(status) = filter.status.as_deref() {
        if ![STATUS_IN_PROGRESS, STATUS_COMPLETED, STATUS_CANCELLED].contains(&status) {
            return Err(ServiceError::Validation(format!(
                "unknown session status '{status}'"
            )));
        }
    }
    let limit = filter
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let offset = filter.offset.unwrap_or(0).max(0);
    Ok(storage
        .list_sessions(
            user_id,
            filter.task_id.as_deref(),
            filter.status.as_deref(),
            limit,
            offset,
        )
        .await?)
}

#[derive(Debug, Serialize)]
pub struct FocusStats {
    /// Total completed focus time in minutes.
    pub total_focus_time: i64,
    pub completed_sessions: i64,
}

pub async fn focus_stats(storage: &Storage, user_id: &str) -> Result<FocusStats, ServiceError> {
    let total_focus_time = storage.total_completed_minutes(user_id).await?;
    let completed_sessions = storage.completed_session_count(user_id).await?;
    Ok(FocusStats {
        total_focus_time,
        completed_sessions,
    })
}
