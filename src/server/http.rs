use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::routes::{create_router, AppState};

pub async fn start_server(listen_addr: String, state: AppState) -> Result<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    tracing::info!("Starting camera bridge server on {}", addr);
    tracing::info!("Access cameras at: /cameras/{{camera_id}}/{{snapshot|streams|motion}}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
