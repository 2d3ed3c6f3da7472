//! Zoom REST API client for recording listings, meeting reports and transcript downloads.
//!
//! Every call goes through the shared authenticated client, which attaches the bearer
//! credential, retries rate-limited and failed attempts and logs each attempt with a
//! correlation id. This module turns the final response into a domain result using the
//! upstream status table.

use crate::download_url::{DownloadUrlValidator, ValidatedUrl};
use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use chrono::NaiveDate;
use log::*;
use meeting_auth::api_key::BearerTokenAuth;
use meeting_auth::http::{
    classify, loggable_error, loggable_url, AuthenticatedClient, AuthenticatedClientBuilder,
    MiddlewareError, ResponseClass,
};
use reqwest::redirect::Policy;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use service::config::Config;

/// Largest page the recordings listing accepts.
const RECORDINGS_PAGE_SIZE: &str = "300";

/// Redirect hops followed before a download is abandoned.
const MAX_REDIRECTS: usize = 5;

/// Longest vendor error message echoed back to callers.
const MAX_VENDOR_MESSAGE_LEN: usize = 200;

/// One page of `GET /users/{userId}/recordings`.
#[derive(Debug, Deserialize)]
pub struct RecordingsPage {
    #[serde(default)]
    pub meetings: Vec<ZoomMeeting>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A meeting with its cloud recording files, as returned by the listing and by
/// `GET /meetings/{meetingId}/recordings`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoomMeeting {
    pub id: u64,
    pub uuid: String,
    #[serde(default)]
    pub topic: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub recording_files: Vec<ZoomRecordingFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoomRecordingFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub recording_type: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ZoomUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The subset of `GET /report/meetings/{meetingId}` the gateway reads.
#[derive(Debug, Deserialize)]
pub struct MeetingReport {
    #[serde(default)]
    pub tracking_fields: Vec<TrackingField>,
}

#[derive(Debug, Deserialize)]
pub struct TrackingField {
    pub field: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl TrackingField {
    /// The field value as text; numeric values are rendered in decimal.
    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::String(value) => Some(value.clone()),
            serde_json::Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }
}

/// Error payload Zoom returns alongside a 4xx.
#[derive(Debug, Default, Deserialize)]
struct ZoomErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Zoom API client
pub struct ZoomClient {
    client: AuthenticatedClient,
    base_url: String,
}

impl ZoomClient {
    /// Create a Zoom client from process configuration.
    ///
    /// Redirects are only followed while every hop passes `validator`, so a signed
    /// download reference cannot bounce the bearer credential to another host.
    pub fn new(config: &Config, validator: &DownloadUrlValidator) -> Result<Self, Error> {
        let redirect_validator = validator.clone();
        let redirect_policy = Policy::custom(move |attempt| {
            if attempt.previous().len() > MAX_REDIRECTS {
                warn!("Stopped following Zoom redirects after {MAX_REDIRECTS} hops");
                attempt.stop()
            } else if redirect_validator.is_trusted_url(attempt.url()) {
                attempt.follow()
            } else {
                warn!(
                    "Refused Zoom redirect to untrusted host {}",
                    attempt.url().host_str().unwrap_or("<none>")
                );
                attempt.stop()
            }
        });

        let client = AuthenticatedClientBuilder::new()
            .with_auth(Box::new(BearerTokenAuth::new(config.zoom_bearer_token())))
            .with_timeout(config.upstream_timeout())
            .with_max_retries(config.upstream_max_retries)
            .with_backoff(config.upstream_base_delay(), config.upstream_max_delay())
            .with_user_agent(format!("zoom-gateway/{}", env!("CARGO_PKG_VERSION")))
            .with_redirect_policy(redirect_policy)
            .build()?;

        Ok(Self {
            client,
            base_url: config.zoom_api_base_url().to_string(),
        })
    }

    /// List the cloud recordings a user holds within `[from, to]`.
    pub async fn fetch_recordings(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<RecordingsPage, Error> {
        let url = self.endpoint(&format!("users/{}/recordings", encode_path_segment(user_id)))?;
        let query = [
            ("page_size", RECORDINGS_PAGE_SIZE.to_string()),
            ("from", from.format("%Y-%m-%d").to_string()),
            ("to", to.format("%Y-%m-%d").to_string()),
        ];

        debug!("Listing Zoom recordings from {from} to {to}");
        let response = self.get(url, &query).await?;
        Self::json(response).await
    }

    /// Look up a user by id or email address.
    pub async fn fetch_user(&self, user_id: &str) -> Result<ZoomUser, Error> {
        let url = self.endpoint(&format!("users/{}", encode_path_segment(user_id)))?;
        let response = self.get(url, &[]).await?;
        Self::json(response).await
    }

    /// Fetch a single meeting together with its recording files.
    pub async fn fetch_meeting_recordings(&self, meeting_id: &str) -> Result<ZoomMeeting, Error> {
        let url = self.endpoint(&format!(
            "meetings/{}/recordings",
            encode_path_segment(meeting_id)
        ))?;
        let response = self.get(url, &[]).await?;
        Self::json(response).await
    }

    /// Fetch the past-meeting report, keyed by meeting id or meeting UUID.
    pub async fn fetch_meeting_report(&self, meeting_ref: &str) -> Result<MeetingReport, Error> {
        let url = self.endpoint(&format!(
            "report/meetings/{}",
            encode_path_segment(meeting_ref)
        ))?;
        let response = self.get(url, &[]).await?;
        Self::json(response).await
    }

    /// Download the raw transcript artifact behind a validated download reference.
    pub async fn fetch_transcript_bytes(&self, url: &ValidatedUrl) -> Result<Vec<u8>, Error> {
        let response = self.get(url.as_url().clone(), &[]).await?;
        let bytes = response.bytes().await.map_err(|e| {
            let e = e.without_url();
            warn!("Failed to read Zoom transcript body: {e}");
            Error::from(e)
        })?;

        debug!("Downloaded Zoom transcript ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Url::parse(&format!("{}/{}", self.base_url, path)).map_err(|e| {
            warn!("Failed to build Zoom API URL: {e}");
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::Internal(crate::error::InternalErrorKind::Config),
            }
        })
    }

    async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<Response, Error> {
        let target = loggable_url(&url);
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Zoom request to {target} failed: {}", loggable_error(&e));
            Error::from(without_url(e))
        })?;

        let status = response.status();
        match classify(status) {
            ResponseClass::Success => Ok(response),
            ResponseClass::RateLimited => {
                warn!("Zoom rate limit persisted after retries");
                Err(Error {
                    source: None,
                    error_kind: DomainErrorKind::External(ExternalErrorKind::RateLimited),
                })
            }
            ResponseClass::Unavailable => {
                warn!("Zoom unavailable after retries: {target} -> {status}");
                Err(Error {
                    source: None,
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Unavailable),
                })
            }
            ResponseClass::Rejected => {
                let body = rejection_body(response.text().await);
                let error = rejected(status, &body);
                info!("Zoom rejected {target} with {status}: {:?}", error.error_kind);
                Err(error)
            }
        }
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
        response.json::<T>().await.map_err(|e| {
            let e = e.without_url();
            warn!("Failed to parse Zoom response: {e}");
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Invalid response from Zoom".to_string(),
                )),
            }
        })
    }
}

/// Drop the request URL from a transport error so the signed query string of a download
/// reference never ends up in an error chain.
fn without_url(err: MiddlewareError) -> MiddlewareError {
    match err {
        MiddlewareError::Reqwest(e) => MiddlewareError::Reqwest(e.without_url()),
        other => other,
    }
}

/// Body of a rejection, or nothing when it cannot be read. The rejection is then reported
/// with the status reason alone.
fn rejection_body(read: reqwest::Result<String>) -> String {
    read.unwrap_or_else(|e| {
        debug!("Failed to read Zoom rejection body: {}", e.without_url());
        String::new()
    })
}

/// Build the rejection error for a non-retryable response, keeping only a sanitized
/// vendor message.
fn rejected(status: StatusCode, body: &str) -> Error {
    let payload: ZoomErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = payload
        .message
        .as_deref()
        .map(sanitize_message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            if status.is_redirection() {
                "Zoom redirected to an untrusted location".to_string()
            } else {
                status
                    .canonical_reason()
                    .unwrap_or("Zoom rejected the request")
                    .to_string()
            }
        });

    Error {
        source: None,
        error_kind: DomainErrorKind::External(ExternalErrorKind::Rejected {
            status: status.as_u16(),
            code: payload.code,
            message,
        }),
    }
}

fn sanitize_message(message: &str) -> String {
    let cleaned: String = message
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(MAX_VENDOR_MESSAGE_LEN)
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Percent-encode an id for use as a path segment.
///
/// Zoom requires meeting UUIDs that begin with `/` or contain `//` to be encoded twice.
fn encode_path_segment(value: &str) -> String {
    let once = urlencoding::encode(value).into_owned();
    if value.starts_with('/') || value.contains("//") {
        urlencoding::encode(&once).into_owned()
    } else {
        once
    }
}
