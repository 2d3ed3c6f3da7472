//! Controller for transcript retrieval.

use crate::error::ErrorBody;
use crate::params::transcript::TranscriptParams;
use crate::params::{bad_query, required};
use crate::response::TranscriptResponse;
use crate::{AppState, Error};

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use domain::transcript as TranscriptApi;
use log::*;

/// GET the parsed transcript behind a vendor download URL
#[utoipa::path(
    get,
    path = "/recording/transcript",
    params(TranscriptParams),
    responses(
        (status = 200, description = "Successfully retrieved and parsed the transcript", body = TranscriptResponse),
        (status = 400, description = "Untrusted download URL or unparseable transcript", body = ErrorBody),
        (status = 401, description = "Invalid or missing access key", body = ErrorBody),
        (status = 502, description = "Zoom unavailable", body = ErrorBody),
        (status = 503, description = "Zoom rate limit exhausted", body = ErrorBody)
    ),
    security(
        ("access_key" = [])
    )
)]
pub async fn recording_transcript(
    State(app_state): State<AppState>,
    params: Result<Query<TranscriptParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = params.map_err(bad_query)?;
    let download_url = required("download_url", &params.download_url)?;
    debug!("GET transcript by download URL");

    let transcript = TranscriptApi::transcript_from_url(
        &app_state.zoom_client,
        &app_state.download_url_validator,
        &download_url,
    )
    .await?;

    debug!("Parsed transcript with {} segments", transcript.len());

    Ok(Json(TranscriptResponse { transcript }))
}

/// GET the parsed transcript of a meeting's first transcript file
#[utoipa::path(
    get,
    path = "/meeting/{meeting_id}/transcript",
    params(
        ("meeting_id" = String, Path, description = "Meeting id or meeting UUID"),
    ),
    responses(
        (status = 200, description = "Successfully retrieved and parsed the transcript", body = TranscriptResponse),
        (status = 400, description = "Unparseable transcript", body = ErrorBody),
        (status = 401, description = "Invalid or missing access key", body = ErrorBody),
        (status = 404, description = "No transcript for this meeting", body = ErrorBody),
        (status = 502, description = "Zoom unavailable", body = ErrorBody),
        (status = 503, description = "Zoom rate limit exhausted", body = ErrorBody)
    ),
    security(
        ("access_key" = [])
    )
)]
pub async fn meeting_transcript(
    State(app_state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET transcript for meeting: {meeting_id}");

    let transcript = TranscriptApi::transcript_for_meeting(
        &app_state.zoom_client,
        &app_state.download_url_validator,
        &meeting_id,
    )
    .await?;

    Ok(Json(TranscriptResponse { transcript }))
}
