//! Recording listings for an instructor or a single meeting.
//!
//! Recordings are rebuilt from the vendor's payload on every request. Only video and
//! transcript files are surfaced, each annotated with a human-readable label for its
//! vendor recording type.

use std::collections::HashSet;

use chrono::{DateTime, Days, NaiveDate, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use service::config::Config;
use utoipa::ToSchema;

use crate::error::Error;
use crate::gateway::zoom::{RecordingsPage, ZoomClient, ZoomMeeting, ZoomRecordingFile};

/// Vendor code for "meeting does not exist" on a report lookup by numeric id. Reports of
/// recurring or past meeting instances are only reachable through the meeting UUID.
const REPORT_MEETING_NOT_FOUND_CODE: i64 = 3001;

/// Vendor recording type codes and their labels.
pub const RECORDING_KIND_LABELS: &[(&str, &str)] = &[
    ("shared_screen_with_speaker_view", "Shared screen with speaker view"),
    ("shared_screen_with_speaker_view(CC)", "Shared screen with speaker view (CC)"),
    ("shared_screen_with_gallery_view", "Shared screen with gallery view"),
    ("speaker_view", "Speaker view"),
    ("gallery_view", "Gallery view"),
    ("shared_screen", "Shared screen"),
    ("active_speaker", "Active speaker"),
    ("audio_only", "Audio only"),
    ("audio_transcript", "Audio transcript"),
    ("closed_caption", "Closed captions"),
    ("chat_file", "Chat"),
    ("poll", "Poll"),
    ("host_video", "Host video"),
    ("timeline", "Timeline"),
    ("summary", "Summary"),
];

/// Label for a vendor recording type code; unknown codes are passed through unchanged.
pub fn recording_kind_label(code: &str) -> String {
    RECORDING_KIND_LABELS
        .iter()
        .find(|(vendor_code, _)| *vendor_code == code)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| code.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileKind {
    Video,
    Transcript,
}

impl FileKind {
    /// Map a vendor file type; types the gateway does not surface map to `None`.
    pub fn from_vendor(file_type: &str) -> Option<Self> {
        match file_type {
            "MP4" => Some(FileKind::Video),
            "TRANSCRIPT" => Some(FileKind::Transcript),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecordingFile {
    pub id: String,
    pub file_type: FileKind,
    /// Vendor recording type code, e.g. `shared_screen_with_speaker_view`.
    pub recording_type: String,
    pub recording_label: String,
    /// Signed, time-limited vendor URL. Only fetched after validation.
    pub download_url: String,
}

impl RecordingFile {
    fn from_vendor(file: ZoomRecordingFile) -> Option<Self> {
        let file_type = FileKind::from_vendor(file.file_type.as_deref()?)?;
        let download_url = file.download_url.filter(|url| !url.is_empty())?;
        let recording_type = file.recording_type.unwrap_or_default();

        Some(Self {
            id: file.id.unwrap_or_default(),
            file_type,
            recording_label: recording_kind_label(&recording_type),
            recording_type,
            download_url,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Recording {
    pub id: u64,
    pub uuid: String,
    pub topic: String,
    pub start_time: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    pub has_transcript: bool,
    pub recording_files: Vec<RecordingFile>,
}

impl From<ZoomMeeting> for Recording {
    fn from(meeting: ZoomMeeting) -> Self {
        let recording_files: Vec<RecordingFile> = meeting
            .recording_files
            .into_iter()
            .filter_map(RecordingFile::from_vendor)
            .collect();
        let has_transcript = recording_files
            .iter()
            .any(|file| file.file_type == FileKind::Transcript);

        Self {
            id: meeting.id,
            uuid: meeting.uuid,
            topic: meeting.topic,
            start_time: meeting.start_time,
            duration: meeting.duration,
            has_transcript,
            recording_files,
        }
    }
}

/// Consecutive `(from, to)` date ranges walking back from `today` to `history_start`,
/// newest first.
///
/// Each window spans `days` days (at least one); the oldest is clipped at `history_start`.
/// `max_count` caps the number of windows. At least one window is always produced and
/// windows do not overlap.
pub fn date_windows(
    today: NaiveDate,
    days: u32,
    history_start: NaiveDate,
    max_count: Option<u32>,
) -> Vec<(NaiveDate, NaiveDate)> {
    let span = Days::new(u64::from(days.max(1)));
    let max_count = max_count.unwrap_or(u32::MAX).max(1) as usize;
    let mut windows = Vec::new();
    let mut to = today;

    while windows.len() < max_count {
        let from = to
            .checked_sub_days(span)
            .map_or(history_start, |from| from.max(history_start));
        windows.push((from.min(to), to));
        match from.checked_sub_days(Days::new(1)) {
            Some(next) if next >= history_start => to = next,
            _ => break,
        }
    }

    windows
}

/// List an instructor's recordings, optionally only those tracked against `course_id`.
///
/// `instructor_id` may be a vendor user id or an email/login. When the vendor does not
/// know it, the user is resolved once and the listing retried; an unknown user yields an
/// empty list. An empty `course_id` means no course filter; any other value is compared
/// verbatim.
pub async fn list_for_instructor(
    client: &ZoomClient,
    config: &Config,
    instructor_id: &str,
    course_id: Option<&str>,
) -> Result<Vec<Recording>, Error> {
    let course_id = course_id.filter(|id| !id.is_empty());
    info!(
        "Listing recordings for instructor {instructor_id}{}",
        course_id
            .map(|id| format!(" filtered by course {id}"))
            .unwrap_or_default()
    );

    let Some(meetings) = fetch_instructor_meetings(client, config, instructor_id).await? else {
        info!("No Zoom user found for instructor {instructor_id}");
        return Ok(Vec::new());
    };
    debug!("Found {} recorded meetings before filtering", meetings.len());

    let mut recordings = Vec::new();
    for meeting in meetings {
        if let Some(course_id) = course_id {
            let tracked =
                tracked_course(client, &meeting, config.course_tracking_field()).await?;
            if tracked.as_deref() != Some(course_id) {
                debug!("Meeting {} is not tracked against course {course_id}", meeting.id);
                continue;
            }
        }
        recordings.push(Recording::from(meeting));
    }

    info!(
        "Returning {} recordings for instructor {instructor_id}",
        recordings.len()
    );
    Ok(recordings)
}

/// The single recording of one meeting.
pub async fn list_for_meeting(client: &ZoomClient, meeting_id: &str) -> Result<Vec<Recording>, Error> {
    let meeting = client.fetch_meeting_recordings(meeting_id).await?;
    Ok(vec![Recording::from(meeting)])
}

/// All meetings with recordings across the configured date windows, deduplicated by UUID.
/// `None` when the instructor cannot be resolved to a vendor user.
async fn fetch_instructor_meetings(
    client: &ZoomClient,
    config: &Config,
    instructor_id: &str,
) -> Result<Option<Vec<ZoomMeeting>>, Error> {
    let today = Utc::now().date_naive();
    let windows = date_windows(
        today,
        config.recording_window_days,
        config.recording_history_start,
        config.recording_window_count,
    );
    debug!(
        "Searching {} date windows back to {}",
        windows.len(),
        config.recording_history_start
    );

    let mut user_id = instructor_id.to_string();
    let mut resolved = false;
    let mut seen = HashSet::new();
    let mut meetings = Vec::new();

    for (from, to) in windows {
        let page = match client.fetch_recordings(&user_id, from, to).await {
            Ok(page) => page,
            Err(err) if err.is_upstream_not_found() && !resolved => {
                resolved = true;
                let Some((resolved_id, page)) =
                    resolve_and_retry(client, instructor_id, from, to).await?
                else {
                    return Ok(None);
                };
                user_id = resolved_id;
                page
            }
            Err(err) => return Err(err),
        };

        if page
            .next_page_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
        {
            warn!(
                "Zoom returned more than one page of recordings for {from}..{to}; only the first page is used"
            );
        }

        for meeting in page.meetings {
            if seen.insert(meeting.uuid.clone()) {
                meetings.push(meeting);
            }
        }
    }

    Ok(Some(meetings))
}

/// Resolve `instructor_id` to a vendor user id and list that user's recordings.
async fn resolve_and_retry(
    client: &ZoomClient,
    instructor_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Option<(String, RecordingsPage)>, Error> {
    let user = match client.fetch_user(instructor_id).await {
        Ok(user) => user,
        Err(err) if err.is_upstream_rejected() => return Ok(None),
        Err(err) => return Err(err),
    };
    info!("Retrying recording listing with resolved Zoom user id {}", user.id);

    match client.fetch_recordings(&user.id, from, to).await {
        Ok(page) => Ok(Some((user.id, page))),
        Err(err) if err.is_upstream_rejected() => Ok(None),
        Err(err) => Err(err),
    }
}

/// The course a meeting is tracked against, read from its report's tracking fields.
/// `None` when the report is unavailable or the field is absent.
async fn tracked_course(
    client: &ZoomClient,
    meeting: &ZoomMeeting,
    field_name: &str,
) -> Result<Option<String>, Error> {
    let report = match client.fetch_meeting_report(&meeting.id.to_string()).await {
        Ok(report) => report,
        Err(err)
            if err.is_upstream_not_found()
                && err.upstream_code() == Some(REPORT_MEETING_NOT_FOUND_CODE) =>
        {
            debug!("Retrying report for meeting {} by UUID", meeting.id);
            match client.fetch_meeting_report(&meeting.uuid).await {
                Ok(report) => report,
                Err(err) if err.is_upstream_rejected() => {
                    warn!(
                        "No report for meeting {} by id or UUID; skipping it",
                        meeting.id
                    );
                    return Ok(None);
                }
                Err(err) => return Err(err),
            }
        }
        Err(err) if err.is_upstream_rejected() => {
            warn!("No report for meeting {}; skipping it", meeting.id);
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    Ok(report
        .tracking_fields
        .iter()
        .find(|field| field.field == field_name)
        .and_then(|field| field.value_text()))
}
