//! Upstream response classification.
//!
//! The vendor-specific "which HTTP status means what" decision lives in one table so it
//! can be audited and tested on its own. Both the retry middleware and the vendor gateway
//! read from it.

use reqwest::StatusCode;

/// What an upstream status code means to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx: hand the body back.
    Success,
    /// 429: back off (honouring Retry-After) and retry.
    RateLimited,
    /// Other 3xx/4xx: the vendor refused the request. Never retried.
    Rejected,
    /// 5xx and anything unrecognised: retried, then surfaced as unavailable.
    Unavailable,
}

impl ResponseClass {
    /// Whether a response of this class is worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ResponseClass::RateLimited | ResponseClass::Unavailable)
    }
}

/// Inclusive status ranges, first match wins.
pub const STATUS_TABLE: &[(u16, u16, ResponseClass)] = &[
    (200, 299, ResponseClass::Success),
    (429, 429, ResponseClass::RateLimited),
    (300, 399, ResponseClass::Rejected),
    (400, 499, ResponseClass::Rejected),
    (500, 599, ResponseClass::Unavailable),
];

/// Classify an upstream status code using [`STATUS_TABLE`].
pub fn classify(status: StatusCode) -> ResponseClass {
    let code = status.as_u16();
    STATUS_TABLE
        .iter()
        .find(|(low, high, _)| (*low..=*high).contains(&code))
        .map(|(_, _, class)| *class)
        .unwrap_or(ResponseClass::Unavailable)
}
