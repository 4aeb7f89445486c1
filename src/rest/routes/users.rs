// rest/routes/users.rs — Profile endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::rest::auth::AuthUser;
use crate::users::{self, UserProfile};
use crate::AppContext;

pub async fn get_me(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, ServiceError> {
    Ok(Json(users::get_profile(&ctx.storage, &user_id).await?))
}

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub timezone: String,
}

pub async fn update_me(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<UserProfile>, ServiceError> {
    Ok(Json(
        users::update_timezone(&ctx.storage, &user_id, &body.timezone).await?,
    ))
}

pub async fn delete_me(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ServiceError> {
    users::delete_account(&ctx.storage, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
