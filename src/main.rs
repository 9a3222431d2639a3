use radio_backend::{create_router, AppState, Config, StorageGateway};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let config = Config::from_env()?;

    // Local scratch space for staged uploads and the metadata file
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    if let Some(parent) = config.metadata_file.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    // A missing key file or bucket degrades the service instead of stopping it
    let storage = StorageGateway::from_config(&config).await;
    if !storage.is_initialized() {
        tracing::warn!(
            "{} is not initialized. Uploads and the admin panel will not work. Attempted key: {}",
            storage.client_label(),
            config.firebase_service_account_key_path.display()
        );
    }

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, storage)?);
    let app = create_router(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
