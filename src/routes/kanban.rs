use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

use crate::response::{AppError, SuccessResponse};
use crate::routes::require_user;
use crate::services::kanban::{self, KanbanError};
use crate::state::AppState;

pub async fn get_board(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(goal_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let board = kanban::board(state.db().pool(), &user_id, &goal_id)
        .await
        .map_err(map_kanban_error)?;
    Ok(Json(SuccessResponse::new(board)))
}

fn map_kanban_error(err: KanbanError) -> AppError {
    match err {
        KanbanError::NotFound(msg) => AppError::not_found(msg),
        KanbanError::Corpus(inner) => AppError::invalid_goal_configuration(inner.to_string()),
        KanbanError::Sql(e) => {
            tracing::error!(error = %e, "kanban query failed");
            AppError::db("database query failed")
        }
    }
}
