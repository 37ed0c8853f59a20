//! Chat request lifecycle: submission, resolution, expiry, and withdrawal.

pub mod model;
pub mod negotiator;

pub use model::{ChatRequest, RequestState};
pub use negotiator::{DrainedRequests, RequestNegotiator};
