//! Verified user identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Maximum identity length accepted by [`Identity::parse`].
pub const MAX_IDENTITY_LEN: usize = 64;

/// Stable, unique user identity (the username carried in the bearer token).
///
/// Ordered so that collections keyed by identity have a deterministic
/// iteration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Validate and wrap a raw identity string.
    pub fn parse(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Identity must not be empty"));
        }
        if trimmed.chars().count() > MAX_IDENTITY_LEN {
            return Err(AppError::validation(format!(
                "Identity exceeds {MAX_IDENTITY_LEN} characters"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(AppError::validation("Identity contains control characters"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
