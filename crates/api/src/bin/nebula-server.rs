use std::net::SocketAddr;

use nebula_api::{router, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    nebula_log::init();

    let addr: SocketAddr = std::env::var("NEBULA_API_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "nebula-api listening");

    let app = router(AppState::default());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
