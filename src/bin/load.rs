//! Load stage: insert `CLEAN_DATA_PATH` into the short-term database.
use anyhow::Result;
use dotenvy::dotenv;
use tracing::Instrument;
use uuid::Uuid;

use plant_sensor_pipeline::{load, schema, telemetry, DatabaseConfig, PipelineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    telemetry::init_tracing();

    let cfg = PipelineConfig::from_env()?;
    let db_cfg = DatabaseConfig::from_env()?;
    db_cfg.log_config();

    let span = tracing::info_span!("load", run_id = %Uuid::new_v4());
    async {
        let pool = db_cfg.connect().await?;
        schema::create_schema(&pool).await?;
        let report = load::run_load(&pool, &cfg.clean_data_path).await?;
        tracing::info!("{:?}", report);
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}
