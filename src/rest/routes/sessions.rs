// rest/routes/sessions.rs — Focus session endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::rest::auth::AuthUser;
use crate::sessions::{self, FocusStats, HistoryFilter};
use crate::storage::SessionRow;
use crate::AppContext;

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub task_id: String,
    /// Minutes, 1..=120.
    pub duration: i64,
}

pub async fn start_session(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionRow>), ServiceError> {
    let session =
        sessions::start_session(&ctx.storage, &user_id, &body.task_id, body.duration).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn complete_session(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SessionRow>, ServiceError> {
    Ok(Json(
        sessions::complete_session(&ctx.storage, &id, &user_id).await?,
    ))
}

pub async fn cancel_session(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SessionRow>, ServiceError> {
    Ok(Json(
        sessions::cancel_session(&ctx.storage, &id, &user_id).await?,
    ))
}

#[derive(Deserialize, Default)]
pub struct HistoryQuery {
    pub task_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_sessions(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SessionRow>>, ServiceError> {
    let filter = HistoryFilter {
        task_id: query.task_id,
        status: query.status,
        limit: query.limit,
        offset: query.offset,
    };
    Ok(Json(
        sessions::session_history(&ctx.storage, &user_id, filter).await?,
    ))
}

pub async fn stats(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<FocusStats>, ServiceError> {
    Ok(Json(sessions::focus_stats(&ctx.storage, &user_id).await?))
}
