//! Handlers of the `/tasks` resource. Each one issues exactly one store call.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_derive::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::str::FromStr;
use tracing::info;

use super::error::ApiError;
use crate::datastore::SharedStorage;
use crate::model::{NewTask, Task, TaskId};

const INVALID_BODY: &str = "request body must be a JSON object with a string `content`";

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateTaskRequest {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DeleteTaskResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

fn body_rejected(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge(rejection.body_text())
    } else {
        ApiError::Validation(INVALID_BODY.into())
    }
}

pub async fn list(State(storage): State<SharedStorage>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = storage.list_all().await?;
    Ok(Json(tasks))
}

pub async fn create(
    State(storage): State<SharedStorage>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(request) = payload.map_err(body_rejected)?;
    let new_task = NewTask::try_from(request.content)?;

    let task = storage.insert(new_task).await?;
    info!(id = %task.id, "Created task.");
    Ok(Json(task))
}

pub async fn delete(
    State(storage): State<SharedStorage>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Json<DeleteTaskResponse>, ApiError> {
    let Path(raw_id) = raw_id.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let id = TaskId::from_str(&raw_id)?;

    storage.delete_by_id(id).await?;
    info!(id = %id, "Deleted task.");
    Ok(Json(DeleteTaskResponse { success: true }))
}

pub async fn health(
    State(storage): State<SharedStorage>,
) -> Result<Json<HealthResponse>, ApiError> {
    storage.ping().await?;
    Ok(Json(HealthResponse {
        status: "serving".to_string(),
    }))
}
