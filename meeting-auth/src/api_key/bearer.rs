//! Standard Bearer token authentication.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use secrecy::{ExposeSecret, SecretString};

use super::{AuthMethod, ProviderAuth};
use crate::error::{api_key_error, ApiKeyErrorKind, Error};

/// Standard Bearer token authentication.
///
/// Uses the standard `Authorization: Bearer <token>` header pattern. The header value is
/// marked sensitive so it is never printed by reqwest's or hyper's debug output.
pub struct BearerTokenAuth {
    token: SecretString,
}

impl BearerTokenAuth {
    /// Create a new Bearer token authenticator.
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    fn header_value(&self) -> Result<HeaderValue, Error> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token.expose_secret()))
            .map_err(|_| {
                api_key_error(
                    ApiKeyErrorKind::InvalidFormat,
                    "Bearer token contains characters not allowed in a header",
                )
            })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl ProviderAuth for BearerTokenAuth {
    fn auth_method(&self) -> AuthMethod {
        AuthMethod::BearerToken
    }

    fn authenticate(&self, request: &mut Request) -> Result<(), Error> {
        let value = self.header_value()?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl std::fmt::Debug for BearerTokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenAuth")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
