//! # parley-auth
//!
//! Bearer-token handling for Parley. The chat engine only ever sees a
//! verified [`parley_core::types::Identity`]; this crate is where a token
//! becomes one.
//!
//! ## Modules
//!
//! - `jwt`: HS256 token issuance and validation

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
