//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/health
///
/// Round-trips through the coordinator so a stalled engine shows up as 503.
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let report = state.engine.audit().await?;
    if !report.is_clean() {
        tracing::error!(violations = ?report.violations, "Engine invariants violated");
    }

    Ok(Json(ApiResponse::ok(HealthResponse {
        status: if report.is_clean() { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        engine: state.engine.metrics(),
    })))
}
