//! Extract stage: poll the plant API and write `RAW_DATA_PATH`.
use anyhow::Result;
use dotenvy::dotenv;
use tracing::Instrument;
use uuid::Uuid;

use plant_sensor_pipeline::{extract, telemetry, PipelineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    telemetry::init_tracing();

    let cfg = PipelineConfig::from_env()?;
    cfg.log_config();

    let span = tracing::info_span!("extract", run_id = %Uuid::new_v4());
    let rows = extract::run_extract(&cfg).instrument(span).await?;
    tracing::info!("Extracted {} rows", rows);
    Ok(())
}
