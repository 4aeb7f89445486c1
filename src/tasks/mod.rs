//! Task CRUD with ownership validation.

use crate::error::ServiceError;
use crate::storage::{Storage, TaskRow};

pub async fn create_task(
    storage: &Storage,
    user_id: &str,
    title: &str,
    description: Option<&str>,
) -> Result<TaskRow, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation("title must not be empty".into()));
    }
    Ok(storage.create_task(user_id, title, description).await?)
}

pub async fn list_tasks(storage: &Storage, user_id: &str) -> Result<Vec<TaskRow>, ServiceError> {
    Ok(storage.list_tasks(user_id).await?)
}

pub async fn get_task(
    storage: &Storage,
    task_id: &str,
    user_id: &str,
) -> Result<TaskRow, ServiceError> {
    owned_task(storage, task_id, user_id).await
}

#[derive(Debug, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    /// `Some(None)` clears the description; `None` leaves it untouched.
    pub description: Option<Option<String>>,
    pub is_completed: Option<bool>,
}

pub async fn update_task(
    storage: &Storage,
    task_id: &str,
    user_id: &str,
    update: TaskUpdate,
) -> Result<TaskRow, ServiceError> {
    owned_task(storage, task_id, user_id).await?;
    if let Some(title) = update.title.as_deref() {
        if title.trim().is_empty() {
            return Err(ServiceError::Validation("title must not be empty".into()));
        }
    }
    storage
        .update_task(
            task_id,
            update.title.as_deref(),
            update.description.as_ref().map(|d| d.as_deref()),
            update.is_completed,
        )
        .await?;
    owned_task(storage, task_id, user_id).await
}

pub async fn delete_task(
    storage: &Storage,
    task_id: &str,
    user_id: &str,
) -> Result<(), ServiceError> {
    owned_task(storage, task_id, user_id).await?;
    storage.delete_task(task_id).await?;
    Ok(())
}

async fn owned_task(
    storage: &Storage,
    task_id: &str,
    user_id: &str,
) -> Result<TaskRow, ServiceError> {
    let task = storage
        .get_task(task_id)
        .await?
        .ok_or(ServiceError::NotFound("task"))?;
    if task.user_id != user_id {
        return Err(ServiceError::Forbidden);
    }
    Ok(task)
}
