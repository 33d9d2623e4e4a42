//! Transform stage: clean `RAW_DATA_PATH` into `CLEAN_DATA_PATH`.
use anyhow::Result;
use dotenvy::dotenv;
use uuid::Uuid;

use plant_sensor_pipeline::{run_transform, telemetry, PipelineConfig, TransformOptions};

fn main() -> Result<()> {
    // ---
    dotenv().ok();
    telemetry::init_tracing();

    let cfg = PipelineConfig::from_env()?;
    cfg.log_config();

    let span = tracing::info_span!("transform", run_id = %Uuid::new_v4());
    let _guard = span.enter();

    let options = TransformOptions {
        range_check: cfg.range_check,
    };
    let report = run_transform(&cfg.raw_data_path, &cfg.clean_data_path, &options)?;
    tracing::info!("{:?}", report);
    Ok(())
}
