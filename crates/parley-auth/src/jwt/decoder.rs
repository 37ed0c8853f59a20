//! JWT token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use parley_core::config::AuthConfig;
use parley_core::error::AppError;
use parley_core::types::Identity;

use super::claims::Claims;

/// Validates bearer tokens and extracts the verified identity.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token, returning its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::unauthorized("Token has expired. Please log in again.")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::unauthorized("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::unauthorized("Invalid token signature")
                    }
                    _ => AppError::unauthorized(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Validates a token and returns the identity it was issued to.
    pub fn authenticate(&self, token: &str) -> Result<Identity, AppError> {
        let claims = self.decode(token)?;
        let identity = claims.identity()?;
        tracing::debug!(identity = %identity, jti = %claims.jti, "Token authenticated");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use parley_core::error::ErrorKind;

    use super::*;
    use crate::jwt::encoder::JwtEncoder;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_ttl_minutes: 5,
            leeway_seconds: 0,
        }
    }

    #[test]
    fn test_issued_token_authenticates() {
        let cfg = config("secret-a");
        let alice = Identity::parse("alice").expect("valid");
        let issued = JwtEncoder::new(&cfg).issue(&alice).expect("encode");

        let identity = JwtDecoder::new(&cfg)
            .authenticate(&issued.token)
            .expect("valid token");
        assert_eq!(identity, alice);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let alice = Identity::parse("alice").expect("valid");
        let issued = JwtEncoder::new(&config("secret-a"))
            .issue(&alice)
            .expect("encode");

        let err = JwtDecoder::new(&config("secret-b"))
            .authenticate(&issued.token)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let cfg = config("secret-a");
        let alice = Identity::parse("alice").expect("valid");
        let issued = JwtEncoder::new(&cfg)
            .issue_with_ttl(&alice, chrono::Duration::minutes(-10))
            .expect("encode");

        let err = JwtDecoder::new(&cfg).authenticate(&issued.token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(err.message.contains("expired"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = JwtDecoder::new(&config("secret-a"))
            .authenticate("not.a.jwt")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }
}
