use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::response::{AppError, SuccessResponse};
use crate::routes::require_user;
use crate::services::record::{self, RecordError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRecordRequest {
    plan_id: String,
    study_date: String,
    completed_items: i64,
    #[serde(default)]
    study_minutes: Option<i64>,
}

pub async fn upsert_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpsertRecordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let record = record::upsert_daily_record(
        state.db().pool(),
        &user_id,
        &payload.plan_id,
        &payload.study_date,
        payload.completed_items,
        payload.study_minutes,
    )
    .await
    .map_err(map_record_error)?;
    Ok(Json(SuccessResponse::new(record)))
}

pub async fn list_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let records = record::list_for_plan(state.db().pool(), &user_id, &plan_id)
        .await
        .map_err(map_record_error)?;
    Ok(Json(SuccessResponse::new(records)))
}

fn map_record_error(err: RecordError) -> AppError {
    match err {
        RecordError::Validation(msg) => AppError::validation(msg),
        RecordError::NotFound(msg) => AppError::not_found(msg),
        RecordError::Sql(e) => {
            tracing::error!(error = %e, "daily record query failed");
            AppError::db("database query failed")
        }
    }
}
