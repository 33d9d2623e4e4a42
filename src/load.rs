//! Load stage: inserts the transformed dataset into the short-term store.
//!
//! Each row becomes one `sensor_result`, linked to its `origin` (keyed on
//! longitude and latitude), `botanist` (keyed on phone), `plant` (keyed on
//! api_id) and, for error rows, `plant_availability` (keyed on the reason).
//! Dimension conflicts are ignored. A row that fails to insert is logged and
//! skipped; the rest of the batch still loads.

use std::path::Path;

use chrono::NaiveDateTime;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};

use crate::dataset::read_dataset;
use crate::error::Result;
use crate::models::RawReading;
use crate::transform::field_parsers::parse_canonical;
use crate::transform::parse_rfc1123_timestamp;
use crate::transform::validation::parse_number;

// ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Typed values bound into the insert statements for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRow {
    // ---
    pub api_id: i64,
    pub plant_name: Option<String>,
    pub scientific_name: Option<String>,
    pub cycle: Option<String>,
    pub sunlight: Option<String>,
    pub origin: Option<Origin>,
    pub botanist: Option<Botanist>,
    pub last_watered: Option<NaiveDateTime>,
    pub soil_moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub recording_taken: Option<NaiveDateTime>,
    pub availability: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub longitude: f64,
    pub latitude: f64,
    pub country: Option<String>,
    pub continent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Botanist {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
}

impl LoadRow {
    /// Convert a transformed row. Rows without an `api_id` cannot be linked
    /// to a plant and yield `None`.
    pub fn from_raw(row: &RawReading) -> Option<Self> {
        // ---
        let api_id = row.api_id?;

        let origin = match (
            parse_number(row.longitude.as_deref()),
            parse_number(row.latitude.as_deref()),
        ) {
            (Some(longitude), Some(latitude)) => Some(Origin {
                longitude,
                latitude,
                country: row.country.clone(),
                continent: row.continent.clone(),
            }),
            _ => None,
        };

        let botanist = row.phone.clone().map(|phone| Botanist {
            name: row.botanist_name.clone(),
            email: row.email.clone(),
            phone,
        });

        Some(LoadRow {
            api_id,
            plant_name: row.plant_name.clone(),
            scientific_name: row.scientific_name.clone(),
            cycle: row.cycle.clone(),
            sunlight: row.sunlight.clone(),
            origin,
            botanist,
            last_watered: parse_rfc1123_timestamp(row.last_watered.as_deref()),
            soil_moisture: parse_number(row.soil_moisture.as_deref()),
            temperature: parse_number(row.temperature.as_deref()),
            recording_taken: row.recording_taken.as_deref().and_then(parse_canonical),
            availability: row.error.clone(),
        })
    }
}

/// Read the transformed dataset at `path` and load it.
pub async fn run_load(pool: &PgPool, path: &Path) -> Result<LoadReport> {
    // ---
    let rows = read_dataset(path)?;
    info!("Loading {} rows from {}", rows.len(), path.display());
    Ok(load_dataset(pool, &rows).await)
}

/// Insert every row, each in its own transaction.
pub async fn load_dataset(pool: &PgPool, rows: &[RawReading]) -> LoadReport {
    // ---
    let mut report = LoadReport::default();

    for (index, row) in rows.iter().enumerate() {
        let Some(load_row) = LoadRow::from_raw(row) else {
            warn!("Skipping row {}: no api_id", index + 1);
            report.skipped += 1;
            continue;
        };

        match load_row_in_tx(pool, &load_row).await {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                warn!("Failed to load api_id {}: {}", load_row.api_id, e);
                report.skipped += 1;
            }
        }
    }

    info!(
        "Load complete: {} inserted, {} skipped",
        report.inserted, report.skipped
    );
    report
}

async fn load_row_in_tx(pool: &PgPool, row: &LoadRow) -> std::result::Result<(), sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;
    insert_row(&mut *tx, row).await?;
    tx.commit().await?;
    Ok(())
}

async fn insert_row(conn: &mut PgConnection, row: &LoadRow) -> std::result::Result<(), sqlx::Error> {
    // ---
    let origin_id = match &row.origin {
        Some(origin) => Some(upsert_origin(conn, origin).await?),
        None => None,
    };
    let botanist_id = match &row.botanist {
        Some(botanist) => Some(upsert_botanist(conn, botanist).await?),
        None => None,
    };
    let plant_id = upsert_plant(conn, row, origin_id).await?;
    let availability_id = match &row.availability {
        Some(reason) => Some(upsert_availability(conn, reason).await?),
        None => None,
    };

    debug!(
        "api_id {}: plant={} origin={:?} botanist={:?} availability={:?}",
        row.api_id, plant_id, origin_id, botanist_id, availability_id
    );

    sqlx::query(
        r#"
        INSERT INTO sensor_result (
            plant_id, botanist_id, availability_id,
            last_watered, soil_moisture, temperature, recording_taken
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(plant_id)
    .bind(botanist_id)
    .bind(availability_id)
    .bind(row.last_watered)
    .bind(row.soil_moisture)
    .bind(row.temperature)
    .bind(row.recording_taken)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn upsert_origin(conn: &mut PgConnection, origin: &Origin) -> std::result::Result<i32, sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO origin (longitude, latitude, country, continent)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (longitude, latitude) DO NOTHING
        "#,
    )
    .bind(origin.longitude)
    .bind(origin.latitude)
    .bind(&origin.country)
    .bind(&origin.continent)
    .execute(&mut *conn)
    .await?;

    sqlx::query_scalar("SELECT origin_id FROM origin WHERE longitude = $1 AND latitude = $2")
        .bind(origin.longitude)
        .bind(origin.latitude)
        .fetch_one(&mut *conn)
        .await
}

async fn upsert_botanist(
    conn: &mut PgConnection,
    botanist: &Botanist,
) -> std::result::Result<i32, sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO botanist (name, email, phone)
        VALUES ($1, $2, $3)
        ON CONFLICT (phone) DO NOTHING
        "#,
    )
    .bind(&botanist.name)
    .bind(&botanist.email)
    .bind(&botanist.phone)
    .execute(&mut *conn)
    .await?;

    sqlx::query_scalar("SELECT botanist_id FROM botanist WHERE phone = $1")
        .bind(&botanist.phone)
        .fetch_one(&mut *conn)
        .await
}

async fn upsert_plant(
    conn: &mut PgConnection,
    row: &LoadRow,
    origin_id: Option<i32>,
) -> std::result::Result<i32, sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO plant (api_id, plant_name, scientific_name, cycle, sunlight, origin_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (api_id) DO NOTHING
        "#,
    )
    .bind(row.api_id)
    .bind(&row.plant_name)
    .bind(&row.scientific_name)
    .bind(&row.cycle)
    .bind(&row.sunlight)
    .bind(origin_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query_scalar("SELECT plant_id FROM plant WHERE api_id = $1")
        .bind(row.api_id)
        .fetch_one(&mut *conn)
        .await
}

async fn upsert_availability(
    conn: &mut PgConnection,
    reason: &str,
) -> std::result::Result<i32, sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO plant_availability (type_of_availability)
        VALUES ($1)
        ON CONFLICT (type_of_availability) DO NOTHING
        "#,
    )
    .bind(reason)
    .execute(&mut *conn)
    .await?;

    sqlx::query_scalar(
        "SELECT availability_id FROM plant_availability WHERE type_of_availability = $1",
    )
    .bind(reason)
    .fetch_one(&mut *conn)
    .await
}
