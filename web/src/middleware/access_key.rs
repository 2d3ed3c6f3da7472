use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::*;

use crate::error::{Error, WebErrorKind};
use crate::AppState;

/// Header carrying the caller's shared access key.
pub const ACCESS_KEY_HEADER: &str = "x-access-key";

/// Access gate in front of every gateway endpoint.
///
/// On success the request carries an `AccessContext` extension for the handlers. Any
/// failure is the same 401, whatever was wrong with the key.
pub(crate) async fn require_access_key(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let verified = app_state.access_gate.authenticate(
        request
            .headers()
            .get(ACCESS_KEY_HEADER)
            .map(|value| value.as_bytes()),
    );

    match verified {
        Ok(access_context) => {
            trace!("Access key accepted for {}", access_context.subject);
            request.extensions_mut().insert(access_context);
            next.run(request).await
        }
        Err(_) => {
            warn!(
                "Rejected {} {}: invalid or missing access key",
                request.method(),
                request.uri().path()
            );
            Error::Web(WebErrorKind::Unauthorized).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use clap::Parser;
    use meeting_auth::api_key::AccessContext;
    use service::config::Config;
    use tower::ServiceExt;

    async fn whoami(Extension(context): Extension<AccessContext>) -> String {
        context.subject
    }

    fn app() -> Router {
        let config = Config::parse_from([
            "zoom_gateway_rs",
            "--access-key",
            "caller-secret",
            "--zoom-bearer-token",
            "vendor-token",
        ]);
        let app_state = AppState::new(config).unwrap();

        Router::new()
            .route("/test", get(whoami))
            .route_layer(from_fn_with_state(app_state.clone(), require_access_key))
            .with_state(app_state)
    }

    async fn send(header: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header(ACCESS_KEY_HEADER, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_key_reaches_handler_with_access_context() {
        let (status, body) = send(Some("caller-secret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "gateway_api_user");
    }

    #[tokio::test]
    async fn test_every_failure_is_the_same_401() {
        let missing = send(None).await;
        let empty = send(Some("")).await;
        let wrong = send(Some("caller-secreT")).await;
        let prefix = send(Some("caller")).await;

        assert_eq!(missing.0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&missing.1).unwrap(),
            serde_json::json!({"error": "Invalid or missing access key"})
        );
        for other in [empty, wrong, prefix] {
            assert_eq!(other, missing);
        }
    }
}
