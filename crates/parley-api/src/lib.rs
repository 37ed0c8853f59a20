//! # parley-api
//!
//! HTTP surface for Parley: the `/ws` WebSocket endpoint that feeds the
//! realtime engine, plus a small JSON API for health and presence.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
