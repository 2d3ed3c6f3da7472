//! Error types for the `domain` layer.
use meeting_auth::error::{
    ApiKeyErrorKind, Error as MeetingAuthError, ErrorKind as MeetingAuthErrorKind, HttpErrorKind,
};
use meeting_auth::http::MiddlewareError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. Ultimately the various `error_kind`s are used by `web` to return
/// appropriate HTTP status codes and messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Validation(ValidationErrorKind),
    NotFound(String),
    Config,
    Other(String),
}

/// Caller input the gateway refuses to act on. Never retried.
#[derive(Debug, PartialEq)]
pub enum ValidationErrorKind {
    /// The transcript download reference is malformed or not on the trusted domain.
    InvalidDownloadUrl(String),
    /// The transcript produced no parseable caption blocks.
    MalformedTranscript(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The vendor answered with a non-retryable client error.
    Rejected {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    /// The vendor kept answering 429 until the retry ceiling was reached.
    RateLimited,
    /// 5xx or transport failure after the retry ceiling was reached.
    Unavailable,
    Other(String),
}

impl Error {
    /// Whether the vendor rejected the call with a 404.
    pub fn is_upstream_not_found(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Rejected { status: 404, .. })
        )
    }

    /// Whether the vendor rejected the call with a non-retryable client error.
    pub fn is_upstream_rejected(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Rejected { .. })
        )
    }

    /// The vendor's own error code, when it rejected the call with one.
    pub fn upstream_code(&self) -> Option<i64> {
        match &self.error_kind {
            DomainErrorKind::External(ExternalErrorKind::Rejected { code, .. }) => *code,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
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
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Unavailable),
            }
        }
    }
}

impl From<MeetingAuthError> for Error {
    fn from(err: MeetingAuthError) -> Self {
        let error_kind = match &err.error_kind {
            MeetingAuthErrorKind::Http(HttpErrorKind::BuilderFailed) => DomainErrorKind::Internal(
                InternalErrorKind::Other("Failed to build HTTP client".to_string()),
            ),
            MeetingAuthErrorKind::Http(_) => {
                DomainErrorKind::External(ExternalErrorKind::Unavailable)
            }
            MeetingAuthErrorKind::ApiKey(ApiKeyErrorKind::InvalidFormat) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            MeetingAuthErrorKind::ApiKey(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Other(err.to_string()))
            }
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<MiddlewareError> for Error {
    fn from(err: MiddlewareError) -> Self {
        MeetingAuthError::from(err).into()
    }
}

/// Helper to create a validation error for an untrusted or malformed download reference.
pub fn invalid_download_url(message: &str) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Validation(
            ValidationErrorKind::InvalidDownloadUrl(message.to_string()),
        )),
    }
}

/// Helper to create a validation error for a transcript with no usable caption blocks.
pub fn malformed_transcript(message: &str) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Validation(
            ValidationErrorKind::MalformedTranscript(message.to_string()),
        )),
    }
}

/// Helper to create a not-found error.
pub fn not_found(message: &str) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::NotFound(message.to_string())),
    }
}
