//! This module holds typed parameters for the gateway's query string inputs.
//!
//! Query strings are extracted as `Result<Query<T>, QueryRejection>` so a missing or
//! malformed parameter surfaces as a `400 {"error": ...}` body rather than axum's plain
//! text rejection.

pub(crate) mod recording;
pub(crate) mod transcript;

use axum::extract::rejection::QueryRejection;

use crate::error::{Error, WebErrorKind};

pub(crate) fn bad_query(rejection: QueryRejection) -> Error {
    Error::Web(WebErrorKind::BadRequest(rejection.body_text()))
}

/// Trim a required parameter, failing when nothing is left.
pub(crate) fn required(name: &str, value: &str) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Web(WebErrorKind::BadRequest(format!(
            "Missing required query parameter `{name}`"
        ))));
    }
    Ok(value.to_string())
}
