//! # parley-core
//!
//! Core crate for Parley. Contains the configuration schema, typed
//! identifiers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Parley crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
