use log::{error, info};
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Starting up Zoom recording gateway...");
    info!("Zoom API: {}", config.zoom_api_base_url());
    info!("Trusted download domain: {}", config.zoom_trusted_domain());

    let app_state = match web::AppState::new(config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Failed to initialize the gateway: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
