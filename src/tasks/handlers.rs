use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    CreateTaskRequest, MessageResponse, Pagination, TaskListResponse, TaskResponse,
    UpdateTaskRequest,
};
use super::repo_types::{NewTask, TaskPatch};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    messages,
    state::AppState,
    validation,
};

const MAX_PAGE: i64 = 100;

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

fn check_description(description: &Option<String>) -> AppResult<()> {
    if let Some(d) = description {
        if d.chars().count() > validation::MAX_DESCRIPTION_LEN {
            return Err(AppError::Validation(format!(
                "\"description\" length must be less than or equal to {} characters long",
                validation::MAX_DESCRIPTION_LEN
            )));
        }
    }
    Ok(())
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> AppResult<(StatusCode, HeaderMap, Json<TaskResponse>)> {
    let body = validation::body(payload)?;
    let title = body.title.trim().to_string();
    validation::length("title", &title, validation::TITLE_LEN)?;
    check_description(&body.description)?;

    let task = state
        .tasks
        .create(
            user.id,
            NewTask {
                title,
                description: body.description,
                status: body.status.unwrap_or_default(),
                due_date: body.due_date,
            },
        )
        .await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/tasks/{}", task.id)) {
        headers.insert(LOCATION, location);
    }

    info!(task_id = %task.id, "task created");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(TaskResponse {
            message: messages::TASK_CREATED,
            data: task,
        }),
    ))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    params: Result<Query<Pagination>, QueryRejection>,
) -> AppResult<Json<TaskListResponse>> {
    let p = validation::query(params)?;
    let limit = p.limit.clamp(1, MAX_PAGE);
    let offset = p.offset.max(0);
    let tasks = state.tasks.list_by_user(user.id, limit, offset).await?;
    Ok(Json(TaskListResponse {
        message: messages::DATA_FETCHED,
        data: tasks,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<TaskResponse>> {
    let id = validation::path(id)?;
    let task = state
        .tasks
        .get(user.id, id)
        .await?
        .ok_or(AppError::TaskNotFound)?;
    Ok(Json(TaskResponse {
        message: messages::DATA_FETCHED,
        data: task,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> AppResult<Json<TaskResponse>> {
    let id = validation::path(id)?;
    let body = validation::body(payload)?;
    let title = body.title.map(|t| t.trim().to_string());
    if let Some(t) = &title {
        validation::length("title", t, validation::TITLE_LEN)?;
    }
    check_description(&body.description)?;

    let patch = TaskPatch {
        title,
        description: body.description,
        status: body.status,
        due_date: body.due_date,
    };
    let task = state
        .tasks
        .update(user.id, id, patch)
        .await?
        .ok_or(AppError::TaskNotFound)?;

    info!(task_id = %id, "task updated");
    Ok(Json(TaskResponse {
        message: messages::TASK_UPDATED,
        data: task,
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let id = validation::path(id)?;
    if !state.tasks.delete(user.id, id).await? {
        return Err(AppError::TaskNotFound);
    }
    info!(task_id = %id, "task deleted");
    Ok(Json(MessageResponse {
        message: messages::TASK_DELETED,
    }))
}
