// rest/routes/streaks.rs — Streak status endpoint.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::rest::auth::AuthUser;
use crate::streaks::{self, StreakInfo};
use crate::AppContext;

pub async fn get_streak(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StreakInfo>, ServiceError> {
    Ok(Json(streaks::streak_for_user(&ctx.storage, &user_id).await?))
}
