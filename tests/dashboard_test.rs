use std::sync::Arc;

use anyhow::Result;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use reqwest::Client;
use serde::Deserialize;

use plant_sensor_pipeline::routes::{self, ArchiveSource};

const ARCHIVE: &str = "\
plant_name,scientific_name,api_id,cycle,last_watered,soil_moisture,temperature,sunlight,recording_taken,longitude,latitude,country,continent,botanist_name,email,phone,error
Cactus,,1,,,10,20,,2023-08-30 09:00:01,1,2,BR,America,,,,
Cactus,,1,,,20,30,,2023-08-30 10:00:01,1,2,BR,America,,,,
Fern,,3,,,40,12,,2023-08-30 10:00:01,3,4,GB,Europe,,,,No Error
,,4,,,,,,,,,,,,,,Timeout
";

#[derive(Debug, Deserialize)]
struct PlantAverage {
    plant_name: String,
    average_soil_moisture: f64,
    readings: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorCount {
    api_id: i64,
    errors: usize,
}

/// Serve the dashboard on an ephemeral port and return its base URL.
async fn spawn_dashboard(store: Arc<dyn ObjectStore>) -> Result<String> {
    // ---
    let app = routes::router(ArchiveSource::new(store, "full_s3_data.csv"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(format!("http://{}", addr))
}

async fn seeded_store() -> Result<Arc<dyn ObjectStore>> {
    // ---
    let store = InMemory::new();
    store
        .put(
            &ObjectPath::from("full_s3_data.csv"),
            PutPayload::from(ARCHIVE.as_bytes().to_vec()),
        )
        .await?;
    Ok(Arc::new(store))
}

#[tokio::test]
async fn health_endpoint_ok() -> Result<()> {
    // ---
    let base = spawn_dashboard(Arc::new(InMemory::new())).await?;

    let body: serde_json::Value = Client::new()
        .get(format!("{}/health", base))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn soil_moisture_summary_filters_plants() -> Result<()> {
    // ---
    let base = spawn_dashboard(seeded_store().await?).await?;
    let client = Client::new();

    let all: Vec<PlantAverage> = client
        .get(format!("{}/summary/soil-moisture", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].plant_name, "Cactus");
    assert_eq!(all[0].average_soil_moisture, 15.0);
    assert_eq!(all[0].readings, 2);

    let only_fern: Vec<PlantAverage> = client
        .get(format!("{}/summary/soil-moisture?plants=Fern", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(only_fern.len(), 1);
    assert_eq!(only_fern[0].plant_name, "Fern");

    Ok(())
}

#[tokio::test]
async fn error_summary_counts_error_rows() -> Result<()> {
    // ---
    let base = spawn_dashboard(seeded_store().await?).await?;

    let counts: Vec<ErrorCount> = Client::new()
        .get(format!("{}/summary/errors", base))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].api_id, 4);
    assert_eq!(counts[0].errors, 1);
    Ok(())
}

#[tokio::test]
async fn missing_archive_is_empty_summary() -> Result<()> {
    // ---
    let base = spawn_dashboard(Arc::new(InMemory::new())).await?;

    let response = Client::new()
        .get(format!("{}/summary/continents", base))
        .send()
        .await?;
    assert!(response.status().is_success());

    let body: Vec<serde_json::Value> = response.json().await?;
    assert!(body.is_empty());
    Ok(())
}
