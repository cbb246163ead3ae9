mod goals;
mod health;
mod kanban;
mod plans;
mod progress;
mod records;
mod streak;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;

use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/goals", post(goals::create_goal))
        .route("/api/goals/:id", get(goals::get_goal))
        .route("/api/goals/:id/current", put(goals::set_current_goal))
        .route("/api/goals/:id/progress", get(goals::get_progress))
        .route("/api/plans", post(plans::create_plan))
        .route("/api/plans/:id", get(plans::get_summary))
        .route("/api/plans/:id/recompute", post(plans::recompute_target))
        .route("/api/plans/:id/status", put(plans::update_status))
        .route("/api/plans/:id/records", get(records::list_records))
        .route("/api/records", post(records::upsert_record))
        .route("/api/progress/review", post(progress::review_item))
        .route("/api/progress/master", post(progress::master_item))
        .route("/api/progress/forget", post(progress::forget_item))
        .route("/api/progress/reset", post(progress::reset_item))
        .route("/api/kanban/:goal_id", get(kanban::get_board))
        .route("/api/streak", get(streak::get_streak))
        .route("/api/streak/reset", post(streak::reset_streak))
        .route("/health", get(health::health))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}

/// Identity is established upstream; handlers trust the `x-user-id`
/// header the gateway injects after authentication.
pub(crate) fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized("missing x-user-id header"))
}
