//! Extract stage: polls the plant API and writes one raw row per plant id.
//!
//! Every id in `0..=NUMBER_OF_PLANTS` is fetched on its own tokio task. A
//! failed or incomplete response still yields a row, tagged with an error
//! reason that the transform carries through untouched.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::dataset::write_dataset;
use crate::error::Result;
use crate::models::RawReading;

// ---

pub const TIMEOUT_ERROR: &str = "Timeout: The request could not be completed.";
pub const MISSING_TEMPERATURE_ERROR: &str = "Missing temperature reading.";
pub const MISSING_SOIL_MOISTURE_ERROR: &str = "Missing soil_moisture reading.";
pub const MISSING_FIELD_ERROR: &str = "Missing field in data.";

/// Fetch every plant concurrently. Rows are returned sorted by `api_id`.
pub async fn extract_plants(config: &PipelineConfig) -> Result<Vec<RawReading>> {
    // ---
    let client = Client::builder()
        .timeout(Duration::from_secs(u64::from(config.request_timeout_secs)))
        .build()?;

    let base_url = config.plant_api_url.trim_end_matches('/');
    let mut tasks = JoinSet::new();
    for plant_id in 0..=config.number_of_plants {
        let client = client.clone();
        let url = format!("{}/{}", base_url, plant_id);
        tasks.spawn(async move { acquire_plant_data(&client, &url, i64::from(plant_id)).await });
    }

    let mut rows = Vec::with_capacity(config.number_of_plants as usize + 1);
    while let Some(row) = tasks.join_next().await {
        rows.push(row?);
    }
    rows.sort_by_key(|row| row.api_id);

    let errors = rows.iter().filter(|row| row.error.is_some()).count();
    info!(
        "Extracted {} plants ({} with errors)",
        rows.len(),
        errors
    );
    Ok(rows)
}

/// Extract every plant and write the raw dataset. Returns the row count.
pub async fn run_extract(config: &PipelineConfig) -> Result<usize> {
    // ---
    let rows = extract_plants(config).await?;
    write_dataset(&config.raw_data_path, &rows)?;
    info!(
        "Wrote raw dataset to {}",
        config.raw_data_path.display()
    );
    Ok(rows.len())
}

async fn acquire_plant_data(client: &Client, url: &str, plant_id: i64) -> RawReading {
    // ---
    debug!("Fetching plant {} from {}", plant_id, url);

    let body = match client.get(url).send().await {
        Ok(response) => response.json::<Value>().await,
        Err(e) => Err(e),
    };

    match body {
        Ok(body) => plant_row(plant_id, &body),
        Err(e) if e.is_timeout() => {
            debug!("Plant {} timed out", plant_id);
            RawReading::error_row(plant_id, TIMEOUT_ERROR)
        }
        Err(e) => {
            debug!("Plant {} request failed: {}", plant_id, e);
            RawReading::error_row(plant_id, format!("Request failed: {e}"))
        }
    }
}

/// Turn one API response body into a raw row.
pub fn plant_row(plant_id: i64, body: &Value) -> RawReading {
    // ---
    let api_id = body
        .get("plant_id")
        .and_then(Value::as_i64)
        .unwrap_or(plant_id);

    if let Some(error) = body.get("error") {
        let reason = value_text(error).unwrap_or_else(|| MISSING_FIELD_ERROR.to_string());
        return RawReading::error_row(api_id, reason);
    }
    if body.get("temperature").map_or(true, Value::is_null) {
        return RawReading::error_row(api_id, MISSING_TEMPERATURE_ERROR);
    }
    if body.get("soil_moisture").map_or(true, Value::is_null) {
        return RawReading::error_row(api_id, MISSING_SOIL_MOISTURE_ERROR);
    }

    relevant_data(api_id, body).unwrap_or_else(|| {
        debug!("Plant {} is missing a required field", api_id);
        RawReading::error_row(api_id, MISSING_FIELD_ERROR)
    })
}

/// Pick the pipeline's columns out of a complete response body.
fn relevant_data(api_id: i64, body: &Value) -> Option<RawReading> {
    // ---
    let origin = body.get("origin_location")?.as_array()?;
    let botanist = body.get("botanist")?;
    let continent = origin
        .get(4)?
        .as_str()?
        .split('/')
        .next()
        .map(str::to_string);

    Some(RawReading {
        plant_name: Some(value_text(body.get("name")?)?),
        scientific_name: Some(optional_text(body, "scientific_name")),
        api_id: Some(api_id),
        cycle: Some(optional_text(body, "cycle")),
        last_watered: body.get("last_watered").and_then(value_text),
        soil_moisture: body.get("soil_moisture").and_then(value_text),
        temperature: body.get("temperature").and_then(value_text),
        sunlight: Some(optional_text(body, "sunlight")),
        recording_taken: body.get("recording_taken").and_then(value_text),
        longitude: Some(value_text(origin.first()?)?),
        latitude: Some(value_text(origin.get(1)?)?),
        country: Some(value_text(origin.get(3)?)?),
        continent,
        botanist_name: Some(value_text(botanist.get("name")?)?),
        email: Some(value_text(botanist.get("email")?)?),
        phone: Some(value_text(botanist.get("phone")?)?),
        error: None,
    })
}

fn optional_text(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(value_text)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Render a JSON value as a CSV cell. Arrays become `['a', 'b']` literals.
fn value_text(value: &Value) -> Option<String> {
    // ---
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|item| format!("'{}'", value_text(item).unwrap_or_default()))
                .collect();
            Some(format!("[{}]", items.join(", ")))
        }
        other => Some(other.to_string()),
    }
}
