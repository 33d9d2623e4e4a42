//! Aggregates over the long-term archive, served by the dashboard routes.
//!
//! The archive mixes clean rows and error rows. A row is clean when its error
//! column is empty or reads `No Error`.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::RawReading;
use crate::transform::validation::parse_number;

// ---

const NO_ERROR: &str = "No Error";
const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantAverage {
    pub plant_name: String,
    pub average_soil_moisture: f64,
    pub readings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorCount {
    pub api_id: i64,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinentCount {
    pub continent: String,
    pub plants: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinentAverage {
    pub continent: String,
    pub average_temperature: f64,
    pub readings: usize,
}

pub fn is_clean(row: &RawReading) -> bool {
    match row.error.as_deref() {
        None => true,
        Some(error) => error.trim().is_empty() || error == NO_ERROR,
    }
}

/// Running sum for a mean, keyed by group name.
#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

fn grouped_means<'a>(
    rows: impl Iterator<Item = (&'a str, Option<f64>)>,
) -> BTreeMap<&'a str, Mean> {
    // ---
    let mut groups: BTreeMap<&str, Mean> = BTreeMap::new();
    for (key, value) in rows {
        if let Some(value) = value {
            let mean = groups.entry(key).or_default();
            mean.sum += value;
            mean.count += 1;
        }
    }
    groups
}

/// Mean soil moisture per plant name, optionally restricted to `plants`.
pub fn average_soil_moisture(rows: &[RawReading], plants: Option<&[String]>) -> Vec<PlantAverage> {
    // ---
    let selected = rows
        .iter()
        .filter(|row| is_clean(row))
        .filter_map(|row| Some((row.plant_name.as_deref()?, row)))
        .filter(|(name, _)| plants.map_or(true, |wanted| wanted.iter().any(|p| p == name)))
        .map(|(name, row)| (name, parse_number(row.soil_moisture.as_deref())));

    grouped_means(selected)
        .into_iter()
        .map(|(plant_name, mean)| PlantAverage {
            plant_name: plant_name.to_string(),
            average_soil_moisture: mean.sum / mean.count as f64,
            readings: mean.count,
        })
        .collect()
}

/// Number of error rows per plant id, ordered by id.
pub fn error_counts(rows: &[RawReading]) -> Vec<ErrorCount> {
    // ---
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for row in rows.iter().filter(|row| !is_clean(row)) {
        if let Some(api_id) = row.api_id {
            *counts.entry(api_id).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(api_id, errors)| ErrorCount { api_id, errors })
        .collect()
}

/// Number of distinct plants per continent. Each plant counts once, under the
/// continent of its first clean row.
pub fn continent_counts(rows: &[RawReading]) -> Vec<ContinentCount> {
    // ---
    let mut seen = HashSet::new();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows.iter().filter(|row| is_clean(row)) {
        if !seen.insert(row.plant_name.as_deref()) {
            continue;
        }
        let continent = row.continent.as_deref().unwrap_or(UNKNOWN);
        *counts.entry(continent).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(continent, plants)| ContinentCount {
            continent: continent.to_string(),
            plants,
        })
        .collect()
}

/// Mean temperature per continent of origin.
pub fn average_temperature_by_continent(rows: &[RawReading]) -> Vec<ContinentAverage> {
    // ---
    let selected = rows.iter().filter(|row| is_clean(row)).map(|row| {
        (
            row.continent.as_deref().unwrap_or(UNKNOWN),
            parse_number(row.temperature.as_deref()),
        )
    });

    grouped_means(selected)
        .into_iter()
        .map(|(continent, mean)| ContinentAverage {
            continent: continent.to_string(),
            average_temperature: mean.sum / mean.count as f64,
            readings: mean.count,
        })
        .collect()
}
