//! Bounded exponential backoff with Retry-After support.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use http::Extensions;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use reqwest_retry::{RetryDecision, RetryPolicy};
use tracing::{debug, warn};

use super::correlation::{loggable_error, CorrelationId};
use super::status::classify;

/// Exponential backoff retry policy.
///
/// Retries failed requests with exponentially increasing delays, capped at a maximum.
#[derive(Debug, Clone)]
pub struct RetryAfterPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryAfterPolicy {
    /// Create a new retry policy with default settings.
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Maximum number of retry attempts
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Set the delay before the first retry.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the upper bound for any single wait, Retry-After hints included.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Calculate exponential backoff delay.
    fn exponential_delay(&self, n_attempts: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * 2_f64.powi(n_attempts as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Wait before the next attempt: the larger of the backoff and the vendor's hint,
    /// never more than `max_delay`.
    fn wait_for(&self, execute_after: SystemTime, hint: Option<Duration>) -> Duration {
        let backoff = execute_after
            .duration_since(SystemTime::now())
            .unwrap_or_default();
        backoff
            .max(hint.unwrap_or_default())
            .min(self.max_delay)
    }
}

impl RetryPolicy for RetryAfterPolicy {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            RetryDecision::DoNotRetry
        } else {
            let delay = self.exponential_delay(n_past_retries);
            RetryDecision::Retry {
                execute_after: SystemTime::now() + delay,
            }
        }
    }
}

/// Parse a `Retry-After` header given either as delay-seconds or as an HTTP-date.
pub fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(SystemTime::now()).unwrap_or_default())
}

/// Transport failures worth another attempt. Local failures (a request that cannot be
/// built, a credential another middleware refused to attach) fail the same way every time.
fn is_transport_error(err: &reqwest_middleware::Error) -> bool {
    match err {
        reqwest_middleware::Error::Reqwest(e) => !e.is_builder(),
        reqwest_middleware::Error::Middleware(_) => false,
    }
}

/// Retries rate-limited (429), server-error (5xx) and transport failures according to a
/// [`RetryAfterPolicy`]. Anything the status table does not mark retryable, and any error
/// raised by an inner middleware, is returned to the caller after the first attempt.
///
/// When the ceiling is reached the last response (or transport error) is returned as-is,
/// leaving the final classification to the caller.
pub struct RetryAfterMiddleware {
    policy: RetryAfterPolicy,
}

impl RetryAfterMiddleware {
    pub fn new(policy: RetryAfterPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Middleware for RetryAfterMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let correlation_id = extensions
            .get::<CorrelationId>()
            .map(|id| id.to_string())
            .unwrap_or_default();
        let request_start_time = SystemTime::now();
        let mut n_past_retries = 0;
        let mut current = req;

        loop {
            // Requests with streaming bodies cannot be replayed, they get a single attempt.
            let replay = current.try_clone();
            let result = next.clone().run(current, extensions).await;

            let hint = match &result {
                Ok(response) if classify(response.status()).is_retryable() => {
                    Some(retry_after_hint(response.headers()))
                }
                Ok(_) => None,
                Err(e) if is_transport_error(e) => Some(None),
                Err(_) => None,
            };

            let (Some(hint), Some(replay)) = (hint, replay) else {
                return result;
            };

            let execute_after = match self.policy.should_retry(request_start_time, n_past_retries)
            {
                RetryDecision::Retry { execute_after } => execute_after,
                RetryDecision::DoNotRetry => {
                    warn!(
                        "[{}] giving up after {} attempts",
                        correlation_id,
                        n_past_retries + 1
                    );
                    return result;
                }
            };

            let wait = self.policy.wait_for(execute_after, hint);
            match &result {
                Ok(response) => debug!(
                    "[{}] attempt {} got {}, retrying in {:?}",
                    correlation_id,
                    n_past_retries + 1,
                    response.status(),
                    wait
                ),
                Err(e) => debug!(
                    "[{}] attempt {} failed ({}), retrying in {:?}",
                    correlation_id,
                    n_past_retries + 1,
                    loggable_error(e),
                    wait
                ),
            }

            tokio::time::sleep(wait).await;
            n_past_retries += 1;
            current = replay;
        }
    }
}
