// rest/routes/auth.rs — Registration and token rotation.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::rest::auth::AuthUser;
use crate::AppContext;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub timezone: Option<String>,
}

pub async fn register(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let (user, token) =
        crate::auth::register(&ctx.storage, &body.email, body.timezone.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": {
                "id": user.id,
                "email": user.email,
                "timezone": user.timezone,
                "created_at": user.created_at,
            },
            "token": token,
        })),
    ))
}

pub async fn rotate_token(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ServiceError> {
    let token = crate::auth::rotate_token(&ctx.storage, &user_id).await?;
    Ok(Json(json!({ "token": token })))
}
