use std::{net::SocketAddr, sync::Arc};

use swish::{
    common::{logger, types::AnyResult},
    configs::{Config, DEFAULT_CONFIG_PATH},
    routeplanner,
    server::AppState,
    sources::YtDlpResolver,
    transport,
    voice::UnavailableTransport,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let (config, defaulted) = Config::load(&config_path)?;

    logger::init(&config.logging);
    if defaulted {
        warn!("{} not found, using default configuration", config_path);
    } else {
        info!("Loaded configuration from {}", config_path);
    }

    let rotator = routeplanner::from_config(&config.rotation)?;
    let resolver = Arc::new(YtDlpResolver::new(&config.search, rotator.clone()));
    let voice_transport = Arc::new(UnavailableTransport);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, rotator, resolver, voice_transport));
    let app = transport::http_server::router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Swish server started on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Swish server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
