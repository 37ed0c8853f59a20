//! WebSocket authentication: turns the bearer token presented at upgrade
//! time into a verified identity.

use std::sync::Arc;

use parley_auth::jwt::JwtDecoder;
use parley_core::error::AppError;
use parley_core::types::Identity;

/// Authenticates WebSocket connections using JWT tokens.
#[derive(Clone)]
pub struct WsAuthenticator {
    decoder: Arc<JwtDecoder>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    /// Creates a new WebSocket authenticator.
    pub fn new(decoder: Arc<JwtDecoder>) -> Self {
        Self { decoder }
    }

    /// Authenticates a connection from the `token` query parameter.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Identity, AppError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Missing token query parameter"))?;
        self.decoder.authenticate(token)
    }
}

#[cfg(test)]
mod tests {
    use parley_auth::jwt::JwtEncoder;
    use parley_core::config::AuthConfig;
    use parley_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_missing_token_is_unauthorized() {
        let auth = WsAuthenticator::new(Arc::new(JwtDecoder::new(&AuthConfig::default())));
        assert_eq!(auth.authenticate(None).unwrap_err().kind, ErrorKind::Authentication);
        assert_eq!(auth.authenticate(Some("  ")).unwrap_err().kind, ErrorKind::Authentication);
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let config = AuthConfig::default();
        let alice = Identity::parse("alice").expect("valid");
        let token = JwtEncoder::new(&config).issue(&alice).expect("issue").token;

        let auth = WsAuthenticator::new(Arc::new(JwtDecoder::new(&config)));
        assert_eq!(auth.authenticate(Some(&token)).expect("authenticated"), alice);
    }
}
