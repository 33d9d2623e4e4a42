//! Dashboard server: JSON aggregates over the long-term archive.
use anyhow::Result;
use dotenvy::dotenv;

use plant_sensor_pipeline::routes::{self, ArchiveSource};
use plant_sensor_pipeline::{storage, telemetry, DashboardConfig, StorageConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    telemetry::init_tracing();

    let storage_cfg = StorageConfig::from_env()?;
    storage_cfg.log_config();
    let dashboard_cfg = DashboardConfig::from_env()?;

    let store = storage::connect(&storage_cfg)?;
    let app = routes::router(ArchiveSource::new(store, storage_cfg.archive_key.as_str()));

    tracing::info!("Listening on {}", dashboard_cfg.addr);
    let listener = tokio::net::TcpListener::bind(dashboard_cfg.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
