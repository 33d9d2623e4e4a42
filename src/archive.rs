//! Archive stage: ages old rows out of the short-term store.
//!
//! Rows older than the configured age are read back into the tabular row
//! shape, appended to the consolidated archive CSV in object storage and then
//! deleted from the database. The deletion only commits after the new archive
//! version has been uploaded, so a failed run leaves both sides unchanged.

use chrono::{Duration, NaiveDateTime, Utc};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use crate::dataset::{read_dataset_from, write_dataset_to};
use crate::error::{PipelineError, Result};
use crate::models::{RawReading, LAST_WATERED_FORMAT, RECORDING_TAKEN_FORMAT};

// ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Rows moved out of the short-term store in this run.
    pub archived: usize,
    /// Rows in the archive after this run.
    pub total: usize,
}

/// One joined `sensor_result` row as read back for archiving.
#[derive(Debug, sqlx::FromRow)]
struct ArchivedRow {
    // ---
    sensor_result_id: i32,
    plant_name: Option<String>,
    scientific_name: Option<String>,
    api_id: i64,
    cycle: Option<String>,
    last_watered: Option<NaiveDateTime>,
    soil_moisture: Option<f64>,
    temperature: Option<f64>,
    sunlight: Option<String>,
    recording_taken: Option<NaiveDateTime>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    country: Option<String>,
    continent: Option<String>,
    botanist_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    error: Option<String>,
}

impl From<ArchivedRow> for RawReading {
    fn from(row: ArchivedRow) -> Self {
        // ---
        RawReading {
            plant_name: row.plant_name,
            scientific_name: row.scientific_name,
            api_id: Some(row.api_id),
            cycle: row.cycle,
            last_watered: row
                .last_watered
                .map(|t| t.format(LAST_WATERED_FORMAT).to_string()),
            soil_moisture: row.soil_moisture.map(|v| v.to_string()),
            temperature: row.temperature.map(|v| v.to_string()),
            sunlight: row.sunlight,
            recording_taken: row
                .recording_taken
                .map(|t| t.format(RECORDING_TAKEN_FORMAT).to_string()),
            longitude: row.longitude.map(|v| v.to_string()),
            latitude: row.latitude.map(|v| v.to_string()),
            country: row.country,
            continent: row.continent,
            botanist_name: row.botanist_name,
            email: row.email,
            phone: row.phone,
            error: row.error,
        }
    }
}

/// Rows selected for archiving, with the ids needed to delete them.
#[derive(Debug, Clone, Default)]
pub struct ArchiveBatch {
    pub sensor_result_ids: Vec<i32>,
    pub rows: Vec<RawReading>,
}

/// Point in time before which rows are archived.
pub fn cutoff(now: NaiveDateTime, age_hours: u32) -> NaiveDateTime {
    now - Duration::hours(i64::from(age_hours))
}

/// Read and lock every sensor result older than `cutoff`, oldest first.
pub async fn select_rows_older_than(
    conn: &mut PgConnection,
    cutoff: NaiveDateTime,
) -> Result<ArchiveBatch> {
    // ---
    let rows: Vec<ArchivedRow> = sqlx::query_as(
        r#"
        SELECT
            sr.sensor_result_id,
            p.plant_name,
            p.scientific_name,
            p.api_id,
            p.cycle,
            sr.last_watered,
            sr.soil_moisture,
            sr.temperature,
            p.sunlight,
            sr.recording_taken,
            o.longitude,
            o.latitude,
            o.country,
            o.continent,
            b.name AS botanist_name,
            b.email,
            b.phone,
            av.type_of_availability AS error
        FROM sensor_result sr
        JOIN plant p ON sr.plant_id = p.plant_id
        LEFT JOIN origin o ON p.origin_id = o.origin_id
        LEFT JOIN botanist b ON sr.botanist_id = b.botanist_id
        LEFT JOIN plant_availability av ON sr.availability_id = av.availability_id
        WHERE COALESCE(sr.recording_taken, sr.loaded_at) < $1
        ORDER BY COALESCE(sr.recording_taken, sr.loaded_at), sr.sensor_result_id
        FOR UPDATE OF sr
        "#,
    )
    .bind(cutoff)
    .fetch_all(&mut *conn)
    .await?;

    let sensor_result_ids = rows.iter().map(|row| row.sensor_result_id).collect();
    let rows = rows.into_iter().map(RawReading::from).collect();
    Ok(ArchiveBatch {
        sensor_result_ids,
        rows,
    })
}

/// Delete the given sensor results. Returns the row count.
pub async fn delete_sensor_results(conn: &mut PgConnection, ids: &[i32]) -> Result<u64> {
    // ---
    let result = sqlx::query("DELETE FROM sensor_result WHERE sensor_result_id = ANY($1)")
        .bind(ids)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

/// Download the archive. A missing archive reads as an empty table.
pub async fn read_archive(store: &dyn ObjectStore, key: &ObjectPath) -> Result<Vec<RawReading>> {
    // ---
    match store.get(key).await {
        Ok(object) => {
            let bytes = object.bytes().await?;
            read_dataset_from(bytes.as_ref())
        }
        Err(object_store::Error::NotFound { .. }) => {
            debug!("No archive at {}, starting a new one", key);
            Ok(Vec::new())
        }
        Err(e) => Err(PipelineError::Storage(e)),
    }
}

/// Append `rows` after the existing archive rows and upload the result,
/// replacing the previous version. Returns the new archive row count.
pub async fn append_to_archive(
    store: &dyn ObjectStore,
    key: &ObjectPath,
    rows: &[RawReading],
) -> Result<usize> {
    // ---
    let mut archive = read_archive(store, key).await?;
    archive.extend_from_slice(rows);

    let mut buffer = Vec::new();
    write_dataset_to(&mut buffer, &archive)?;
    store.put(key, PutPayload::from(buffer)).await?;

    info!(
        "Uploaded archive {} with {} rows ({} new)",
        key,
        archive.len(),
        rows.len()
    );
    Ok(archive.len())
}

/// Move rows older than `age_hours` from the database into the archive.
pub async fn run_archive(
    pool: &PgPool,
    store: &dyn ObjectStore,
    key: &ObjectPath,
    age_hours: u32,
) -> Result<ArchiveReport> {
    // ---
    let cutoff = cutoff(Utc::now().naive_utc(), age_hours);
    info!("Archiving rows recorded before {}", cutoff);

    let mut tx = pool.begin().await?;
    let batch = select_rows_older_than(&mut *tx, cutoff).await?;
    if batch.rows.is_empty() {
        info!("Nothing to archive");
        tx.rollback().await?;
        return Ok(ArchiveReport::default());
    }

    let total = append_to_archive(store, key, &batch.rows).await?;
    let deleted = delete_sensor_results(&mut *tx, &batch.sensor_result_ids).await?;
    tx.commit().await?;

    info!(
        "Archived {} rows, deleted {} from the short-term store",
        batch.rows.len(),
        deleted
    );
    Ok(ArchiveReport {
        archived: batch.rows.len(),
        total,
    })
}
