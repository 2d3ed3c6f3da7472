use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use domain::error::{
    DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
    ValidationErrorKind,
};

use log::*;

#[derive(Debug)]
pub enum Error {
    Domain(DomainError),
    Web(WebErrorKind),
}

/// Failures detected by the web layer itself, before any domain logic runs.
#[derive(Debug)]
pub enum WebErrorKind {
    Unauthorized,
    BadRequest(String),
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Vendor rejection status to caller-facing status; unlisted statuses become 400.
/// A 401/403 means the gateway's own vendor credential was refused.
const REJECTED_STATUS_TABLE: &[(u16, StatusCode)] = &[
    (400, StatusCode::BAD_REQUEST),
    (401, StatusCode::BAD_GATEWAY),
    (403, StatusCode::BAD_GATEWAY),
    (404, StatusCode::NOT_FOUND),
    (409, StatusCode::CONFLICT),
    (422, StatusCode::BAD_REQUEST),
];

fn rejected_status(upstream_status: u16) -> StatusCode {
    REJECTED_STATUS_TABLE
        .iter()
        .find(|(status, _)| *status == upstream_status)
        .map(|(_, mapped)| *mapped)
        .unwrap_or(StatusCode::BAD_REQUEST)
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            Error::Web(web_error_kind) => match web_error_kind {
                WebErrorKind::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    "Invalid or missing access key".to_string(),
                ),
                WebErrorKind::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            },
            Error::Domain(domain_error) => match domain_error.error_kind {
                DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                    InternalErrorKind::Validation(validation_error_kind) => {
                        match validation_error_kind {
                            ValidationErrorKind::InvalidDownloadUrl(message) => {
                                (StatusCode::BAD_REQUEST, message)
                            }
                            ValidationErrorKind::MalformedTranscript(message) => {
                                (StatusCode::BAD_REQUEST, message)
                            }
                        }
                    }
                    InternalErrorKind::NotFound(message) => (StatusCode::NOT_FOUND, message),
                    InternalErrorKind::Config | InternalErrorKind::Other(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    ),
                },
                DomainErrorKind::External(external_error_kind) => match external_error_kind {
                    ExternalErrorKind::Rejected {
                        status, message, ..
                    } => (rejected_status(status), message),
                    ExternalErrorKind::RateLimited => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Zoom rate limit exceeded, try again later".to_string(),
                    ),
                    ExternalErrorKind::Unavailable => (
                        StatusCode::BAD_GATEWAY,
                        "Zoom is currently unavailable".to_string(),
                    ),
                    ExternalErrorKind::Other(message) => (StatusCode::BAD_GATEWAY, message),
                },
            },
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let description = self.to_string();
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            error!("Responding {status}: {description}");
        } else {
            debug!("Responding {status}: {message}");
        }

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self::Domain(err.into())
    }
}
