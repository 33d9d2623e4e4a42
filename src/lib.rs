//! Batch ETL pipeline for the museum plant sensor network.
//!
//! Stages, each with its own binary:
//! - `extract`: poll the plant API into a raw CSV
//! - `transform`: clean the raw CSV into one consistent table
//! - `load`: insert the table into the short-term Postgres store
//! - `archive`: move rows older than a day into the object-storage archive
//! - `dashboard`: serve aggregates over the archive
//!
//! The `pipeline` binary runs extract, transform and load in sequence.

pub mod archive;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod load;
pub mod models;
pub mod routes;
pub mod schema;
pub mod storage;
pub mod telemetry;
pub mod transform;

pub use config::{DashboardConfig, DatabaseConfig, PipelineConfig, StorageConfig};
pub use error::{PipelineError, Result};
pub use models::{CleanedReading, ErrorRecord, PlantRecord, RawReading};
pub use transform::{run_transform, transform_dataset, RangeCheck, TransformOptions, TransformReport};
