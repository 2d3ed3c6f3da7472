//! Controller for recording listings.

use crate::error::ErrorBody;
use crate::params::recording::InstructorRecordingsParams;
use crate::params::{bad_query, required};
use crate::response::RecordingsResponse;
use crate::{AppState, Error};

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use domain::recording as RecordingApi;
use log::*;

/// GET the recordings of an instructor, optionally limited to one course
#[utoipa::path(
    get,
    path = "/instructor/recordings",
    params(InstructorRecordingsParams),
    responses(
        (status = 200, description = "Successfully retrieved the instructor's recordings", body = RecordingsResponse),
        (status = 400, description = "Missing instructor_id", body = ErrorBody),
        (status = 401, description = "Invalid or missing access key", body = ErrorBody),
        (status = 502, description = "Zoom unavailable", body = ErrorBody),
        (status = 503, description = "Zoom rate limit exhausted", body = ErrorBody)
    ),
    security(
        ("access_key" = [])
    )
)]
pub async fn instructor_recordings(
    State(app_state): State<AppState>,
    params: Result<Query<InstructorRecordingsParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = params.map_err(bad_query)?;
    let instructor_id = required("instructor_id", &params.instructor_id)?;
    debug!("GET recordings for instructor: {instructor_id}");

    let recordings = RecordingApi::list_for_instructor(
        &app_state.zoom_client,
        &app_state.config,
        &instructor_id,
        params.course_id.as_deref(),
    )
    .await?;

    debug!("Found {} recordings", recordings.len());

    Ok(Json(RecordingsResponse { recordings }))
}

/// GET the recordings of a single meeting
#[utoipa::path(
    get,
    path = "/meeting/{meeting_id}/recordings",
    params(
        ("meeting_id" = String, Path, description = "Meeting id or meeting UUID"),
    ),
    responses(
        (status = 200, description = "Successfully retrieved the meeting's recordings", body = RecordingsResponse),
        (status = 401, description = "Invalid or missing access key", body = ErrorBody),
        (status = 404, description = "Zoom has no recordings for this meeting", body = ErrorBody),
        (status = 502, description = "Zoom unavailable", body = ErrorBody),
        (status = 503, description = "Zoom rate limit exhausted", body = ErrorBody)
    ),
    security(
        ("access_key" = [])
    )
)]
pub async fn meeting_recordings(
    State(app_state): State<AppState>,
    Path(meeting_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET recordings for meeting: {meeting_id}");

    let recordings = RecordingApi::list_for_meeting(&app_state.zoom_client, &meeting_id).await?;

    Ok(Json(RecordingsResponse { recordings }))
}
