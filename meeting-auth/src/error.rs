//! Error types for the `meeting-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for meeting-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in meeting-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    ApiKey(ApiKeyErrorKind),
    Http(HttpErrorKind),
}

/// Errors from API key and credential operations.
#[derive(Debug, PartialEq)]
pub enum ApiKeyErrorKind {
    /// The configured secret is unusable (e.g. empty).
    InvalidFormat,
    /// The supplied key did not match. Deliberately carries no detail.
    VerificationFailed,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Timeout,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::ApiKey(kind) => write!(f, "API key error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_timeout() {
            ErrorKind::Http(HttpErrorKind::Timeout)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            // Errors raised by this crate's own middleware keep their kind.
            reqwest_middleware::Error::Middleware(err) => match err.downcast::<Error>() {
                Ok(err) => err,
                Err(other) => Error {
                    source: Some(Box::new(reqwest_middleware::Error::Middleware(other))),
                    error_kind: ErrorKind::Http(HttpErrorKind::Network),
                },
            },
        }
    }
}

/// Helper function to create API key errors.
pub fn api_key_error(kind: ApiKeyErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::ApiKey(kind),
    }
}
