use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::response::{AppError, SuccessResponse};
use crate::routes::require_user;
use crate::services::mastery::{self, ItemProgressRecord, MasteryError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProgressRequest {
    goal_id: String,
    item_id: String,
}

pub async fn review_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let progress = mastery::review(
        state.db().pool(),
        &user_id,
        &payload.goal_id,
        &payload.item_id,
    )
    .await
    .map_err(map_mastery_error)?;
    Ok(respond(progress))
}

pub async fn master_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let progress = mastery::mark_mastered(
        state.db().pool(),
        &user_id,
        &payload.goal_id,
        &payload.item_id,
    )
    .await
    .map_err(map_mastery_error)?;
    Ok(respond(progress))
}

pub async fn forget_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let progress = mastery::mark_forgotten(
        state.db().pool(),
        &user_id,
        &payload.goal_id,
        &payload.item_id,
    )
    .await
    .map_err(map_mastery_error)?;
    Ok(respond(progress))
}

pub async fn reset_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let progress = mastery::reset(
        state.db().pool(),
        &user_id,
        &payload.goal_id,
        &payload.item_id,
    )
    .await
    .map_err(map_mastery_error)?;
    Ok(respond(progress))
}

fn respond(progress: ItemProgressRecord) -> Json<SuccessResponse<ItemProgressRecord>> {
    Json(SuccessResponse::new(progress))
}

pub(crate) fn map_mastery_error(err: MasteryError) -> AppError {
    match err {
        MasteryError::NotFound(msg) => AppError::not_found(msg),
        MasteryError::Corpus(inner) => AppError::invalid_goal_configuration(inner.to_string()),
        MasteryError::Sql(e) => {
            tracing::error!(error = %e, "item progress query failed");
            AppError::db("database query failed")
        }
    }
}
