//! The transcript pipeline: validate the download reference, fetch, parse.

use log::*;

use crate::caption::{self, TranscriptSegment};
use crate::download_url::{DownloadUrlValidator, ValidatedUrl};
use crate::error::{malformed_transcript, not_found, Error};
use crate::gateway::zoom::ZoomClient;

const TRANSCRIPT_FILE_TYPE: &str = "TRANSCRIPT";

/// Fetch and parse the transcript behind a caller-supplied download reference.
///
/// The reference is validated before any network call is made.
pub async fn transcript_from_url(
    client: &ZoomClient,
    validator: &DownloadUrlValidator,
    download_url: &str,
) -> Result<Vec<TranscriptSegment>, Error> {
    let url = validator.validate(download_url)?;
    fetch_and_parse(client, &url).await
}

/// Fetch and parse the first transcript file recorded for a meeting.
pub async fn transcript_for_meeting(
    client: &ZoomClient,
    validator: &DownloadUrlValidator,
    meeting_id: &str,
) -> Result<Vec<TranscriptSegment>, Error> {
    let meeting = client.fetch_meeting_recordings(meeting_id).await?;

    let transcript_file = meeting
        .recording_files
        .iter()
        .find(|file| file.file_type.as_deref() == Some(TRANSCRIPT_FILE_TYPE))
        .ok_or_else(|| {
            info!("Meeting {meeting_id} has no transcript file");
            not_found("No transcript found for this meeting")
        })?;

    let download_url = transcript_file
        .download_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| not_found("No transcript download URL available for this meeting"))?;

    let url = validator.validate(download_url)?;
    fetch_and_parse(client, &url).await
}

async fn fetch_and_parse(
    client: &ZoomClient,
    url: &ValidatedUrl,
) -> Result<Vec<TranscriptSegment>, Error> {
    let bytes = client.fetch_transcript_bytes(url).await?;
    let text = String::from_utf8(bytes).map_err(|e| {
        warn!("Transcript is not valid UTF-8: {e}");
        malformed_transcript("Transcript is not valid UTF-8 text")
    })?;
    caption::parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind, ValidationErrorKind};
    use clap::Parser;
    use mockito::{Matcher, Server};
    use service::config::Config;

    const VTT: &str = "WEBVTT\r\n\r\n1\r\n00:00:01,000 --> 00:00:03,000\r\nHello world\r\n\r\n2\r\n00:00:03,500 --> 00:00:05,000\r\nGoodbye\r\n";

    fn client(base_url: &str) -> ZoomClient {
        let config = Config::parse_from([
            "zoom_gateway_rs",
            "--access-key",
            "caller-secret",
            "--zoom-bearer-token",
            "vendor-token",
            "--zoom-api-base-url",
            base_url,
            "--upstream-max-retries",
            "0",
        ]);
        ZoomClient::new(&config, &DownloadUrlValidator::new("127.0.0.1")).unwrap()
    }

    fn validator() -> DownloadUrlValidator {
        DownloadUrlValidator::new("127.0.0.1")
    }

    fn validation_kind(err: &Error) -> Option<&ValidationErrorKind> {
        match &err.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Validation(kind)) => Some(kind),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_transcript_from_url_parses_segments() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/rec/download/t1.vtt")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(VTT)
            .create_async()
            .await;

        let url = format!("{}/rec/download/t1.vtt?access_token=signed", server.url());
        let segments = transcript_from_url(&client(&server.url()), &validator(), &url)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, "Goodbye");
        assert_eq!(segments[1].start.to_string(), "00:00:03.500");
    }

    #[tokio::test]
    async fn test_untrusted_url_is_rejected_before_any_request() {
        let mut server = Server::new_async().await;
        let any = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = transcript_from_url(
            &client(&server.url()),
            &validator(),
            "https://evil.example/zoom.us/file.vtt",
        )
        .await
        .unwrap_err();

        any.assert_async().await;
        assert!(matches!(
            validation_kind(&err),
            Some(ValidationErrorKind::InvalidDownloadUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unparseable_content_is_malformed_transcript() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/rec/download/t1.vtt")
            .with_status(200)
            .with_body("<html>Sign in to continue</html>")
            .create_async()
            .await;

        let url = format!("{}/rec/download/t1.vtt", server.url());
        let err = transcript_from_url(&client(&server.url()), &validator(), &url)
            .await
            .unwrap_err();

        assert!(matches!(
            validation_kind(&err),
            Some(ValidationErrorKind::MalformedTranscript(_))
        ));
    }

    #[tokio::test]
    async fn test_non_utf8_content_is_malformed_transcript() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/rec/download/t1.vtt")
            .with_status(200)
            .with_body([0xff_u8, 0xfe, 0x00, 0x31])
            .create_async()
            .await;

        let url = format!("{}/rec/download/t1.vtt", server.url());
        let err = transcript_from_url(&client(&server.url()), &validator(), &url)
            .await
            .unwrap_err();

        assert!(matches!(
            validation_kind(&err),
            Some(ValidationErrorKind::MalformedTranscript(_))
        ));
    }

    #[tokio::test]
    async fn test_transcript_for_meeting_uses_first_transcript_file() {
        let mut server = Server::new_async().await;
        let meeting_body = format!(
            r#"{{"id":9,"uuid":"u9","topic":"Seminar","start_time":"2024-04-02T14:00:00Z","duration":30,"recording_files":[
                {{"id":"v9","file_type":"MP4","recording_type":"speaker_view","download_url":"{base}/rec/download/v9"}},
                {{"id":"t9","file_type":"TRANSCRIPT","recording_type":"audio_transcript","download_url":"{base}/rec/download/t9.vtt"}}
            ]}}"#,
            base = server.url()
        );
        let _meeting = server
            .mock("GET", "/meetings/9/recordings")
            .with_status(200)
            .with_body(meeting_body)
            .create_async()
            .await;
        let transcript = server
            .mock("GET", "/rec/download/t9.vtt")
            .with_status(200)
            .with_body(VTT)
            .expect(1)
            .create_async()
            .await;

        let segments = transcript_for_meeting(&client(&server.url()), &validator(), "9")
            .await
            .unwrap();

        transcript.assert_async().await;
        assert_eq!(segments[0].text, "Hello world");
    }

    #[tokio::test]
    async fn test_meeting_without_transcript_is_not_found() {
        let mut server = Server::new_async().await;
        let _meeting = server
            .mock("GET", "/meetings/9/recordings")
            .with_status(200)
            .with_body(
                r#"{"id":9,"uuid":"u9","topic":"Seminar","start_time":"2024-04-02T14:00:00Z","duration":30,"recording_files":[{"id":"v9","file_type":"MP4","download_url":"https://zoom.us/rec/download/v9"}]}"#,
            )
            .create_async()
            .await;

        let err = transcript_for_meeting(&client(&server.url()), &validator(), "9")
            .await
            .unwrap_err();

        assert!(matches!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::NotFound(_))
        ));
    }
}
