//! Presence listing handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, PresenceResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/presence
pub async fn list_presence(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<PresenceResponse>>, ApiError> {
    let users = state.engine.presence_snapshot(Some(user.identity())).await?;
    let online = users.iter().filter(|u| u.state.is_online()).count();

    Ok(Json(ApiResponse::ok(PresenceResponse { users, online })))
}
