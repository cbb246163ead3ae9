use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::response::{AppError, SuccessResponse};
use crate::routes::goals::map_goal_error;
use crate::routes::require_user;
use crate::services::plan::{self, CreatePlanInput, PlanError, PlanStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    status: String,
}

pub async fn create_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePlanInput>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let plan = plan::create_plan(state.db().pool(), &user_id, payload)
        .await
        .map_err(map_plan_error)?;
    Ok(Json(SuccessResponse::new(plan)))
}

pub async fn get_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let summary = plan::get_summary(state.db().pool(), &user_id, &plan_id)
        .await
        .map_err(map_plan_error)?;
    Ok(Json(SuccessResponse::new(summary)))
}

pub async fn recompute_target(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let plan = plan::recompute_target(state.db().pool(), &user_id, &plan_id)
        .await
        .map_err(map_plan_error)?;
    Ok(Json(SuccessResponse::with_message(
        plan,
        "daily target recomputed",
    )))
}

pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let status = PlanStatus::parse(&payload.status).ok_or_else(|| {
        AppError::validation(format!(
            "unknown plan status '{}', expected ACTIVE, COMPLETED, PAUSED or CANCELLED",
            payload.status
        ))
    })?;
    let plan = plan::update_status(state.db().pool(), &user_id, &plan_id, status)
        .await
        .map_err(map_plan_error)?;
    Ok(Json(SuccessResponse::new(plan)))
}

pub(crate) fn map_plan_error(err: PlanError) -> AppError {
    match err {
        PlanError::Validation(msg) => AppError::validation(msg),
        PlanError::InvalidDateRange(msg) => AppError::invalid_date_range(msg),
        PlanError::NotFound(msg) => AppError::not_found(msg),
        PlanError::Goal(inner) => map_goal_error(inner),
        PlanError::Sql(e) => {
            tracing::error!(error = %e, "plan query failed");
            AppError::db("database query failed")
        }
    }
}
