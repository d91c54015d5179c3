//! pfw-ws - Prooflow Workflow Service
//!
//! Coordinates multiple users picking photos from shared pools through the
//! claiming → retouch → tablo → completed workflow, with transactional
//! claim finalization and best-effort conflict notifications.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pfw_common::events::EventBus;
use pfw_ws::config::ServiceConfig;
use pfw_ws::services::RelayEmailSender;
use pfw_ws::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting pfw-ws (Prooflow Workflow Service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Load TOML config and resolve the root folder
    let toml_config = pfw_common::config::load_toml_config(None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let root_folder = pfw_common::config::resolve_root_folder(None, &toml_config);
    info!("Root folder: {}", root_folder.display());

    // Step 2: Open or create the database
    let db_path = pfw_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let db_pool = pfw_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Step 3: Event bus for workflow event fan-out
    let event_bus = EventBus::new(100);
    info!("Event bus initialized");

    // Step 4: Resolve service configuration and build state
    let service_config = ServiceConfig::resolve(&toml_config);
    let state = AppState::new(
        db_pool.clone(),
        event_bus,
        service_config.media_base_url.clone(),
    );

    // Step 5: Outbox worker (only when a mail relay is configured)
    match &service_config.email_relay_url {
        Some(relay_url) => {
            let sender = Arc::new(RelayEmailSender::new(relay_url.clone()));
            pfw_ws::outbox::spawn(db_pool, sender);
            info!("Outbox worker started (relay: {})", relay_url);
        }
        None => {
            warn!("No email relay configured; conflict notifications will stay queued");
        }
    }

    // Step 6: Serve
    let app = pfw_ws::build_router(state);
    let listener = tokio::net::TcpListener::bind(service_config.bind_addr()).await?;
    info!("Listening on http://{}", service_config.bind_addr());
    info!("Health check: http://{}/health", service_config.bind_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
