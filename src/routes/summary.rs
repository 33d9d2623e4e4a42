use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::ArchiveSource;
use crate::dashboard::{
    average_soil_moisture, average_temperature_by_continent, continent_counts, error_counts,
};
use crate::models::RawReading;

// ---

pub fn router() -> Router<ArchiveSource> {
    // ---
    Router::new()
        .route("/summary/soil-moisture", get(soil_moisture))
        .route("/summary/errors", get(errors))
        .route("/summary/continents", get(continents))
        .route("/summary/temperature", get(temperature))
}

/// Query parameters for the soil moisture summary
#[derive(Debug, Deserialize)]
pub struct PlantFilter {
    /// Comma-separated plant names, e.g. "Cactus,Venus flytrap"
    plants: Option<String>,
}

impl PlantFilter {
    fn names(&self) -> Option<Vec<String>> {
        // ---
        self.plants.as_ref().map(|plants| {
            plants
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

async fn with_archive<T, F>(source: &ArchiveSource, summarize: F) -> axum::response::Response
where
    T: Serialize,
    F: FnOnce(&[RawReading]) -> T,
{
    // ---
    match source.load().await {
        Ok(rows) => {
            debug!("Summarizing {} archived rows", rows.len());
            (StatusCode::OK, Json(summarize(&rows))).into_response()
        }
        Err(e) => {
            error!("Failed to read archive {}: {}", source.key, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "Failed to read archive".to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn soil_moisture(
    Query(filter): Query<PlantFilter>,
    State(source): State<ArchiveSource>,
) -> impl IntoResponse {
    // ---
    let names = filter.names();
    with_archive(&source, |rows| average_soil_moisture(rows, names.as_deref())).await
}

async fn errors(State(source): State<ArchiveSource>) -> impl IntoResponse {
    with_archive(&source, error_counts).await
}

async fn continents(State(source): State<ArchiveSource>) -> impl IntoResponse {
    with_archive(&source, continent_counts).await
}

async fn temperature(State(source): State<ArchiveSource>) -> impl IntoResponse {
    with_archive(&source, average_temperature_by_continent).await
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_plant_filter_names() {
        // ---
        let filter = PlantFilter {
            plants: Some("Cactus, Venus flytrap,,".to_string()),
        };
        assert_eq!(
            filter.names(),
            Some(vec!["Cactus".to_string(), "Venus flytrap".to_string()])
        );

        let empty = PlantFilter { plants: None };
        assert_eq!(empty.names(), None);
    }
}
