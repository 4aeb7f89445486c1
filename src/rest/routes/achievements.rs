// rest/routes/achievements.rs — Catalog and unlock projections.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::achievements::{self, AchievementView};
use crate::error::ServiceError;
use crate::rest::auth::AuthUser;
use crate::AppContext;

pub async fn list_achievements(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<AchievementView>>, ServiceError> {
    Ok(Json(
        achievements::list_for_user(&ctx.storage, &user_id).await?,
    ))
}

pub async fn list_unlocked(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<AchievementView>>, ServiceError> {
    Ok(Json(
        achievements::list_unlocked(&ctx.storage, &user_id).await?,
    ))
}
