//! HTTP client building with middleware.

mod client;
mod correlation;
mod retry;
mod status;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig};
pub use correlation::{loggable_error, loggable_url, CorrelationId, CorrelationMiddleware};
pub use retry::{retry_after_hint, RetryAfterMiddleware, RetryAfterPolicy};
pub use status::{classify, ResponseClass, STATUS_TABLE};

/// Error type returned by [`AuthenticatedClient`] calls.
pub use reqwest_middleware::Error as MiddlewareError;
