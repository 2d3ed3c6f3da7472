//! Authenticated HTTP client builder with middleware.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Extensions;
use reqwest::redirect::Policy;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, Middleware, Next};
use tracing::debug;

use super::{CorrelationMiddleware, RetryAfterMiddleware, RetryAfterPolicy};
use crate::api_key::ProviderAuth;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    /// Upper bound for a single backoff wait.
    pub max_delay: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            user_agent: format!("meeting-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Authenticated HTTP client with middleware.
pub type AuthenticatedClient = reqwest_middleware::ClientWithMiddleware;

/// Applies the provider credential to every attempt, innermost so retries are covered.
struct AuthMiddleware {
    auth: Arc<dyn ProviderAuth>,
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.auth
            .authenticate(&mut req)
            .map_err(reqwest_middleware::Error::middleware)?;
        next.run(req, extensions).await
    }
}

/// Builder for creating authenticated HTTP clients with middleware.
///
/// Provides a fluent API for constructing HTTP clients with:
/// - Authentication (bearer tokens)
/// - Correlation-id logging of every outbound call
/// - Retry logic with Retry-After header support
/// - Timeout configuration
/// - A redirect policy
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
    auth: Option<Arc<dyn ProviderAuth>>,
    redirect_policy: Option<Policy>,
}

impl AuthenticatedClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
            auth: None,
            redirect_policy: None,
        }
    }

    /// Set the authentication provider.
    pub fn with_auth(mut self, auth: Box<dyn ProviderAuth>) -> Self {
        self.auth = Some(Arc::from(auth));
        self
    }

    /// Set the per-attempt request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the backoff bounds.
    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.config.base_delay = base_delay;
        self.config.max_delay = max_delay;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Set the redirect policy. Defaults to reqwest's policy when unset.
    pub fn with_redirect_policy(mut self, policy: Policy) -> Self {
        self.redirect_policy = Some(policy);
        self
    }

    /// Build the configured HTTP client.
    ///
    /// Middleware order, outermost first: correlation logging, retry, authentication.
    ///
    /// # Returns
    ///
    /// An authenticated HTTP client with middleware configured.
    pub fn build(self) -> Result<AuthenticatedClient, reqwest::Error> {
        // Build the base reqwest client
        let mut client_builder = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent);
        if let Some(policy) = self.redirect_policy {
            client_builder = client_builder.redirect(policy);
        }
        let client = client_builder.build()?;

        let retry_policy = RetryAfterPolicy::new(self.config.max_retries)
            .with_base_delay(self.config.base_delay)
            .with_max_delay(self.config.max_delay);

        let mut builder = ClientBuilder::new(client)
            .with(CorrelationMiddleware)
            .with(RetryAfterMiddleware::new(retry_policy));
        if let Some(auth) = self.auth {
            debug!("Outbound client authenticates with {:?}", auth.auth_method());
            builder = builder.with(AuthMiddleware { auth });
        }

        Ok(builder.build())
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
