use dotenvy::dotenv;
use tracing::info;

use podproxy::config::settings::AppConfig;
use podproxy::state::AppState;
use podproxy::{app, workers};

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting server...");

    let config = AppConfig::new().expect("missing required configuration");
    let state = AppState::new(config);

    state
        .artifacts
        .prepare()
        .expect("failed to prepare the artifact directory");

    tokio::spawn(workers::transcoder::run(state.clone()));
    tokio::spawn(workers::janitor::run(state.clone()));

    let app = app::create_app(state.clone()).await;

    let addr = format!("0.0.0.0:{}", state.config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await.unwrap();
}
