//! Archive stage: move rows older than `ARCHIVE_AGE_HOURS` from the
//! short-term database into the consolidated archive in object storage.
use anyhow::Result;
use dotenvy::dotenv;
use object_store::path::Path as ObjectPath;
use tracing::Instrument;
use uuid::Uuid;

use plant_sensor_pipeline::{
    archive, schema, storage, telemetry, DatabaseConfig, PipelineConfig, StorageConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    telemetry::init_tracing();

    let cfg = PipelineConfig::from_env()?;
    let db_cfg = DatabaseConfig::from_env()?;
    db_cfg.log_config();
    let storage_cfg = StorageConfig::from_env()?;
    storage_cfg.log_config();

    let span = tracing::info_span!("archive", run_id = %Uuid::new_v4());
    async {
        let pool = db_cfg.connect().await?;
        schema::create_schema(&pool).await?;
        let store = storage::connect(&storage_cfg)?;
        let key = ObjectPath::from(storage_cfg.archive_key.as_str());

        let report =
            archive::run_archive(&pool, store.as_ref(), &key, cfg.archive_age_hours).await?;
        tracing::info!("{:?}", report);
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}
