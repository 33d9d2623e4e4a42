//! Short-term store schema.
//!
//! Ensures the five linked tables exist before loading or archiving.
//! Creation only: there is no migration of existing tables.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the short-term store tables (idempotent).
///
/// `origin`, `botanist`, `plant` and `plant_availability` are dimension tables
/// with natural unique keys so repeated loads can insert-or-ignore them.
/// `sensor_result` holds one row per loaded reading or error.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS origin (
            origin_id  SERIAL PRIMARY KEY,
            longitude  DOUBLE PRECISION NOT NULL,
            latitude   DOUBLE PRECISION NOT NULL,
            country    TEXT,
            continent  TEXT,
            UNIQUE (longitude, latitude)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS botanist (
            botanist_id SERIAL PRIMARY KEY,
            name        TEXT,
            email       TEXT,
            phone       TEXT NOT NULL UNIQUE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plant (
            plant_id        SERIAL PRIMARY KEY,
            api_id          BIGINT NOT NULL UNIQUE,
            plant_name      TEXT,
            scientific_name TEXT,
            cycle           TEXT,
            sunlight        TEXT,
            origin_id       INTEGER REFERENCES origin (origin_id)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plant_availability (
            availability_id      SERIAL PRIMARY KEY,
            type_of_availability TEXT NOT NULL UNIQUE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Error rows carry no readings, so every measurement column is nullable.
    // `loaded_at` ages rows that have no `recording_taken`.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_result (
            sensor_result_id SERIAL PRIMARY KEY,
            plant_id         INTEGER NOT NULL REFERENCES plant (plant_id),
            botanist_id      INTEGER REFERENCES botanist (botanist_id),
            availability_id  INTEGER REFERENCES plant_availability (availability_id),
            last_watered     TIMESTAMP,
            soil_moisture    DOUBLE PRECISION,
            temperature      DOUBLE PRECISION,
            recording_taken  TIMESTAMP,
            loaded_at        TIMESTAMP NOT NULL DEFAULT (NOW() AT TIME ZONE 'UTC')
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_result_recording_taken
            ON sensor_result (recording_taken);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
