use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reolink_bridge::camera::{CameraManager, ReolinkClientFactory};
use reolink_bridge::config::AppConfig;
use reolink_bridge::device::ReolinkProvider;
use reolink_bridge::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reolink_bridge=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Reolink camera bridge");

    // Load configuration
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "config/cameras.yaml".to_string());

    let config = AppConfig::load_from_file(&config_path)
        .context("Failed to load configuration")?;

    tracing::info!("Loaded configuration with {} cameras", config.cameras.len());

    let factory = Arc::new(
        ReolinkClientFactory::new(config.server.request_timeout())
            .context("Failed to create HTTP client")?,
    );
    let camera_manager =
        CameraManager::new(factory.clone()).with_poll_interval(config.server.poll_interval());
    let provider = Arc::new(ReolinkProvider::new(
        Arc::new(camera_manager.clone()),
        factory,
    ));

    // Provision all configured cameras; a camera that fails validation is
    // skipped, not fatal.
    let results = futures::future::join_all(
        config
            .cameras
            .into_iter()
            .map(|submission| {
                let provider = Arc::clone(&provider);
                async move {
                    let ip = submission.ip.clone();
                    (ip, provider.create_device(submission).await)
                }
            }),
    )
    .await;

    for (ip, result) in results {
        match result {
            Ok(native_id) => {
                if let Some(camera) = camera_manager.get_camera(&native_id).await {
                    camera.listen_and_log_events();
                }
            }
            Err(e) => tracing::error!("Camera at {} was not admitted: {}", ip, e),
        }
    }

    let state = AppState {
        camera_manager,
        provider,
    };

    server::start_server(config.server.listen_address.clone(), state).await?;

    Ok(())
}
