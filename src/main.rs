//! Entry point for the full `plant-sensor-pipeline` batch run.
//!
//! Runs the three batch stages in order:
//! - extract every plant from the API into `RAW_DATA_PATH`
//! - transform it into `CLEAN_DATA_PATH`
//! - load the cleaned table into the short-term database
//!
//! Configuration comes from the environment or `.env`; see `config` for the
//! recognized keys. Any stage failing aborts the run with a non-zero exit.
use anyhow::Result;
use dotenvy::dotenv;
use tracing::Instrument;
use uuid::Uuid;

use plant_sensor_pipeline::{
    extract, load, run_transform, schema, telemetry, DatabaseConfig, PipelineConfig,
    TransformOptions,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    telemetry::init_tracing();

    let cfg = PipelineConfig::from_env()?;
    cfg.log_config();
    let db_cfg = DatabaseConfig::from_env()?;
    db_cfg.log_config();

    let span = tracing::info_span!("pipeline", run_id = %Uuid::new_v4());
    run(cfg, db_cfg).instrument(span).await
}

async fn run(cfg: PipelineConfig, db_cfg: DatabaseConfig) -> Result<()> {
    // ---
    let extracted = extract::run_extract(&cfg).await?;
    tracing::info!("Extract complete: {} rows", extracted);

    let options = TransformOptions {
        range_check: cfg.range_check,
    };
    let report = run_transform(&cfg.raw_data_path, &cfg.clean_data_path, &options)?;
    tracing::info!("Transform complete: {} rows written", report.output_rows());

    let pool = db_cfg.connect().await?;
    schema::create_schema(&pool).await?;
    let loaded = load::run_load(&pool, &cfg.clean_data_path).await?;
    tracing::info!(
        "Pipeline complete: {} loaded, {} skipped",
        loaded.inserted,
        loaded.skipped
    );

    Ok(())
}
