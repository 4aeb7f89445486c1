// rest/routes/tasks.rs — Task CRUD endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::rest::auth::AuthUser;
use crate::storage::TaskRow;
use crate::tasks::{self, TaskUpdate};
use crate::AppContext;

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TaskRow>>, ServiceError> {
    Ok(Json(tasks::list_tasks(&ctx.storage, &user_id).await?))
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskRow>), ServiceError> {
    let task = tasks::create_task(
        &ctx.storage,
        &user_id,
        &body.title,
        body.description.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskRow>, ServiceError> {
    Ok(Json(tasks::get_task(&ctx.storage, &id, &user_id).await?))
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    /// Present-and-null clears the description; absent leaves it untouched.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_completed: Option<bool>,
}

/// Maps a present JSON field (including `null`) to `Some(...)`, so an absent
/// field stays `None` via `#[serde(default)]`.
fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize as _;
    Option::<String>::deserialize(de).map(Some)
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<TaskRow>, ServiceError> {
    let update = TaskUpdate {
        title: body.title,
        description: body.description,
        is_completed: body.is_completed,
    };
    Ok(Json(
        tasks::update_task(&ctx.storage, &id, &user_id, update).await?,
    ))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    tasks::delete_task(&ctx.storage, &id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
