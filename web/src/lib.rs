//! HTTP surface of the gateway: routing, the access-key gate, controllers and the
//! mapping from domain errors to responses.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use domain::gateway::ZoomClient;
use domain::DownloadUrlValidator;
use log::*;
use meeting_auth::api_key::AccessKeyVerifier;
use service::config::Config;
use tower_http::cors::CorsLayer;

mod controller;
mod error;
pub(crate) mod middleware;
mod params;
mod response;
pub mod router;

pub use error::{Error, WebErrorKind};
pub use middleware::access_key::ACCESS_KEY_HEADER;

/// Read-only state shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub zoom_client: Arc<ZoomClient>,
    pub access_gate: Arc<AccessKeyVerifier>,
    pub download_url_validator: DownloadUrlValidator,
}

impl AppState {
    /// Build the vendor client, the access gate and the download validator from `config`.
    pub fn new(config: Config) -> Result<Self, domain::error::Error> {
        let download_url_validator = DownloadUrlValidator::new(config.zoom_trusted_domain());
        let zoom_client = ZoomClient::new(&config, &download_url_validator)?;
        let access_gate = AccessKeyVerifier::new(&config.access_key())?;

        Ok(Self {
            config,
            zoom_client: Arc::new(zoom_client),
            access_gate: Arc::new(access_gate),
            download_url_validator,
        })
    }
}

/// Bind the configured interface and port and serve the gateway until shutdown.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{}:{}", interface, app_state.config.port);

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers([
            axum::http::header::ACCEPT,
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static(ACCESS_KEY_HEADER),
        ])
        .allow_origin(allowed_origins);

    let listener = tokio::net::TcpListener::bind(&server_url).await?;
    info!("Server starting... listening for connections on http://{server_url}");

    axum::serve(listener, router::define_routes(app_state).layer(cors_layer)).await
}
