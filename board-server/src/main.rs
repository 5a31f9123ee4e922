use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use board_server::config::{BoardOptions, validate_options};
use board_server::coordinator::Coordinator;
use board_server::registry::Registry;
use board_server::web::{AppState, create_router};
use board_server::ztm::{TransitApi, ZtmClient, ZtmConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let api: Arc<dyn TransitApi> =
        Arc::new(ZtmClient::new(ZtmConfig::default()).expect("Failed to create ZTM client"));
    let registry = Registry::new();

    // An initial board can be configured from the environment; otherwise
    // boards are created through the setup page.
    if let Ok(stops) = std::env::var("ZTM_STOPS") {
        let options = BoardOptions {
            stops,
            scan_interval: env_number("ZTM_SCAN_INTERVAL"),
            max_departures: env_number("ZTM_MAX_DEPARTURES"),
            ..Default::default()
        };
        let config = validate_options(&options, api.as_ref())
            .await
            .expect("Invalid ZTM_STOPS configuration");
        println!("Configured initial board with {} stops", config.stop_ids.len());

        let coordinator = Arc::new(Coordinator::new(api.clone(), config));
        registry.register(coordinator.clone()).await;
        tokio::spawn(coordinator.run());
    }

    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    let state = AppState::new(registry, api);
    let app = create_router(state, &static_dir);

    let addr: SocketAddr = std::env::var("ZTM_BIND")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
        .expect("Invalid ZTM_BIND address");

    println!("ZTM Departure Board listening on http://{addr}");
    println!();
    println!("Open http://{addr} in your browser for the boards.");
    println!();
    println!("API Endpoints:");
    println!("  GET  /health                  - Health check");
    println!("  GET  /setup                   - Board setup form");
    println!("  GET  /api/boards              - Board status as JSON");
    println!("  POST /api/refresh             - Refresh all boards now");
    println!("  POST /api/refresh_stop_names  - Reload stop names");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
