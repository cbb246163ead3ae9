use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

use crate::response::{AppError, SuccessResponse};
use crate::routes::require_user;
use crate::services::streak::{self, StreakError};
use crate::state::AppState;

pub async fn get_streak(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let streak = streak::get_streak(state.db().pool(), &user_id)
        .await
        .map_err(map_streak_error)?;
    Ok(Json(SuccessResponse::new(streak)))
}

pub async fn reset_streak(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let streak = streak::reset(state.db().pool(), &user_id)
        .await
        .map_err(map_streak_error)?;
    Ok(Json(SuccessResponse::with_message(streak, "streak reset")))
}

fn map_streak_error(err: StreakError) -> AppError {
    match err {
        StreakError::Sql(e) => {
            tracing::error!(error = %e, "streak query failed");
            AppError::db("database query failed")
        }
    }
}
