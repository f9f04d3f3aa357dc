//! Manual sync trigger.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use episodecast_core::CycleReport;

use super::ErrorResponse;
use crate::state::AppState;

/// POST /api/v1/sync
///
/// Run one sync cycle now. Waits for a cycle already in progress to finish
/// first.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CycleReport>, impl IntoResponse> {
    info!("Manual sync requested");
    match state.engine().run_cycle().await {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err((
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
