//! Route definitions for the Parley HTTP API.
//!
//! JSON routes are mounted under `/api`; the WebSocket endpoint sits at `/ws`.

use axum::Router;
use axum::http::Uri;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use parley_core::error::AppError;

use crate::error::ApiError;
use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/presence", get(handlers::presence::list_presence));

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_upgrade))
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// JSON 404 for unknown paths.
async fn route_not_found(uri: Uri) -> ApiError {
    AppError::not_found(format!("No route for {}", uri.path())).into()
}
