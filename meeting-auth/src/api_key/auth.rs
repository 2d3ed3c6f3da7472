//! Outbound authentication trait.

use reqwest::Request;

use crate::error::Error;

/// Authentication method for HTTP requests.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthMethod {
    /// `Authorization: Bearer <token>`
    BearerToken,
}

/// Trait for authenticating outbound HTTP requests to a vendor.
///
/// Implementations are applied by the client's auth middleware to every attempt,
/// retries included, so the credential never has to pass through request input.
pub trait ProviderAuth: Send + Sync {
    /// Get the authentication method used by this provider.
    fn auth_method(&self) -> AuthMethod;

    /// Apply authentication to an outgoing request.
    fn authenticate(&self, request: &mut Request) -> Result<(), Error>;
}
