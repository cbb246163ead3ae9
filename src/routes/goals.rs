use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

use crate::response::{AppError, SuccessResponse};
use crate::routes::require_user;
use crate::services::goal::{self, CreateGoalInput, GoalError};
use crate::state::AppState;

pub async fn create_goal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGoalInput>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let goal = goal::create_goal(state.db().pool(), &user_id, payload)
        .await
        .map_err(map_goal_error)?;
    Ok(Json(SuccessResponse::new(goal)))
}

pub async fn get_goal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let goal = goal::get_goal(state.db().pool(), &user_id, &goal_id)
        .await
        .map_err(map_goal_error)?;
    Ok(Json(SuccessResponse::new(goal)))
}

pub async fn set_current_goal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let goal = goal::set_current_goal(state.db().pool(), &user_id, &goal_id)
        .await
        .map_err(map_goal_error)?;
    Ok(Json(SuccessResponse::with_message(
        goal,
        "current goal updated",
    )))
}

pub async fn get_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let progress = goal::refresh_progress(state.db().pool(), &user_id, &goal_id)
        .await
        .map_err(map_goal_error)?;
    Ok(Json(SuccessResponse::new(progress)))
}

pub(crate) fn map_goal_error(err: GoalError) -> AppError {
    match err {
        GoalError::Validation(msg) => AppError::validation(msg),
        GoalError::InvalidGoalConfiguration(msg) => AppError::invalid_goal_configuration(msg),
        GoalError::NotFound(msg) => AppError::not_found(msg),
        GoalError::Sql(e) => {
            tracing::error!(error = %e, "goal query failed");
            AppError::db("database query failed")
        }
    }
}
