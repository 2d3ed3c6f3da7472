use crate::{
    controller::health_check_controller, error::ErrorBody,
    middleware::access_key::require_access_key, response, AppState, ACCESS_KEY_HEADER,
};
use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::controller::{recording_controller, transcript_controller};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Zoom Recording Gateway API"
        ),
        paths(
            health_check_controller::health_check,
            recording_controller::instructor_recordings,
            recording_controller::meeting_recordings,
            transcript_controller::recording_transcript,
            transcript_controller::meeting_transcript,
        ),
        components(
            schemas(
                domain::Recording,
                domain::RecordingFile,
                domain::FileKind,
                domain::TranscriptSegment,
                response::RecordingsResponse,
                response::TranscriptResponse,
                ErrorBody,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "zoom_gateway", description = "Zoom recordings and transcripts for LMS callers")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines the shared access key header requirement for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "access_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    ACCESS_KEY_HEADER,
                    "Shared access key issued to the calling LMS",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(recording_routes(app_state.clone()))
        .merge(transcript_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn recording_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/instructor/recordings",
            get(recording_controller::instructor_recordings),
        )
        .route(
            "/meeting/:meeting_id/recordings",
            get(recording_controller::meeting_recordings),
        )
        .route_layer(from_fn_with_state(app_state.clone(), require_access_key))
        .with_state(app_state)
}

fn transcript_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/recording/transcript",
            get(transcript_controller::recording_transcript),
        )
        .route(
            "/meeting/:meeting_id/transcript",
            get(transcript_controller::meeting_transcript),
        )
        .route_layer(from_fn_with_state(app_state.clone(), require_access_key))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use clap::Parser;
    use mockito::{Matcher, Server};
    use serde_json::{json, Value};
    use service::config::Config;
    use tower::ServiceExt;

    const VTT: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello world\n\n2\n00:00:03,500 --> 00:00:05,000\nGoodbye\n";

    fn app(zoom_base_url: &str) -> Router {
        let config = Config::parse_from([
            "zoom_gateway_rs",
            "--access-key",
            "caller-secret",
            "--zoom-bearer-token",
            "vendor-token",
            "--zoom-api-base-url",
            zoom_base_url,
            "--zoom-trusted-domain",
            "127.0.0.1",
            "--upstream-max-retries",
            "0",
            "--recording-window-count",
            "1",
        ]);
        define_routes(AppState::new(config).unwrap())
    }

    async fn get_json(app: Router, uri: &str, access_key: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(key) = access_key {
            request = request.header(ACCESS_KEY_HEADER, key);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_needs_no_access_key() {
        let response = app("http://127.0.0.1:9")
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_gateway_endpoints_require_access_key() {
        for uri in [
            "/instructor/recordings?instructor_id=inst-1",
            "/recording/transcript?download_url=https://zoom.us/rec/t.vtt",
            "/meeting/42/recordings",
            "/meeting/42/transcript",
        ] {
            let (status, body) = get_json(app("http://127.0.0.1:9"), uri, Some("wrong")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body, json!({"error": "Invalid or missing access key"}));
        }
    }

    #[tokio::test]
    async fn test_untrusted_download_url_is_400_without_upstream_call() {
        let mut server = Server::new_async().await;
        let any = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (status, body) = get_json(
            app(&server.url()),
            "/recording/transcript?download_url=https%3A%2F%2Fevil.example%2Fzoom.us%2Ffile.vtt",
            Some("caller-secret"),
        )
        .await;

        any.assert_async().await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_transcript_by_url_returns_segments() {
        let mut server = Server::new_async().await;
        let _file = server
            .mock("GET", "/rec/download/t1.vtt")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(VTT)
            .create_async()
            .await;

        let download_url = format!("{}/rec/download/t1.vtt?access_token=signed", server.url());
        let uri = format!(
            "/recording/transcript?download_url={}",
            urlencode(&download_url)
        );
        let (status, body) = get_json(app(&server.url()), &uri, Some("caller-secret")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"transcript": [
                {"index": 1, "start": "00:00:01.000", "end": "00:00:03.000", "text": "Hello world"},
                {"index": 2, "start": "00:00:03.500", "end": "00:00:05.000", "text": "Goodbye"}
            ]})
        );
    }

    #[tokio::test]
    async fn test_missing_instructor_id_is_400() {
        let (status, body) = get_json(
            app("http://127.0.0.1:9"),
            "/instructor/recordings",
            Some("caller-secret"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_course_filter_matching_nothing_is_200_empty() {
        let mut server = Server::new_async().await;
        let _listing = server
            .mock("GET", "/users/inst-1/recordings")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"meetings":[{"id":1,"uuid":"u1","topic":"Lecture","start_time":"2024-03-01T09:00:00Z","duration":45,"recording_files":[]}]}"#,
            )
            .create_async()
            .await;
        let _report = server
            .mock("GET", "/report/meetings/1")
            .with_status(200)
            .with_body(r#"{"tracking_fields":[{"field":"Canvas Course","value":"CHEM-200"}]}"#)
            .create_async()
            .await;

        let (status, body) = get_json(
            app(&server.url()),
            "/instructor/recordings?instructor_id=inst-1&course_id=BIO-101",
            Some("caller-secret"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"recordings": []}));
    }

    #[tokio::test]
    async fn test_meeting_recordings_and_transcript() {
        let mut server = Server::new_async().await;
        let meeting_body = format!(
            r#"{{"id":42,"uuid":"u42","topic":"Seminar","start_time":"2024-04-02T14:00:00Z","duration":30,"recording_files":[
                {{"id":"v42","file_type":"MP4","recording_type":"speaker_view","download_url":"{base}/rec/download/v42"}},
                {{"id":"t42","file_type":"TRANSCRIPT","recording_type":"audio_transcript","download_url":"{base}/rec/download/t42.vtt"}}
            ]}}"#,
            base = server.url()
        );
        let _meeting = server
            .mock("GET", "/meetings/42/recordings")
            .with_status(200)
            .with_body(meeting_body)
            .expect(2)
            .create_async()
            .await;
        let _file = server
            .mock("GET", "/rec/download/t42.vtt")
            .with_status(200)
            .with_body(VTT)
            .create_async()
            .await;

        let (status, body) =
            get_json(app(&server.url()), "/meeting/42/recordings", Some("caller-secret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recordings"][0]["uuid"], "u42");
        assert_eq!(body["recordings"][0]["has_transcript"], true);
        assert_eq!(
            body["recordings"][0]["recording_files"][1]["file_type"],
            "TRANSCRIPT"
        );

        let (status, body) =
            get_json(app(&server.url()), "/meeting/42/transcript", Some("caller-secret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transcript"][1]["text"], "Goodbye");
    }

    #[tokio::test]
    async fn test_vendor_not_found_maps_to_404() {
        let mut server = Server::new_async().await;
        let _meeting = server
            .mock("GET", "/meetings/404404/recordings")
            .with_status(404)
            .with_body(r#"{"code":3301,"message":"This recording does not exist."}"#)
            .create_async()
            .await;

        let (status, body) = get_json(
            app(&server.url()),
            "/meeting/404404/recordings",
            Some("caller-secret"),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "This recording does not exist."}));
    }

    #[tokio::test]
    async fn test_vendor_outage_maps_to_502() {
        let mut server = Server::new_async().await;
        let _meeting = server
            .mock("GET", "/meetings/42/recordings")
            .with_status(500)
            .create_async()
            .await;

        let (status, _) =
            get_json(app(&server.url()), "/meeting/42/recordings", Some("caller-secret")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_openapi_document_declares_gateway_paths() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for path in [
            "/instructor/recordings",
            "/recording/transcript",
            "/meeting/{meeting_id}/recordings",
            "/meeting/{meeting_id}/transcript",
        ] {
            assert!(doc["paths"][path].is_object(), "{path} missing");
        }
    }

    fn urlencode(value: &str) -> String {
        value
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                _ => format!("%{b:02X}"),
            })
            .collect()
    }
}
