//! Configuration loader for the plant sensor pipeline.
//!
//! Every stage binary reads its settings from environment variables (with
//! optional `.env` support provided by the caller). Each stage loads only the
//! sections it needs, so the transform stage runs without database or bucket
//! credentials.
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::transform::RangeCheck;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional environment variable via `FromStr`, with a default.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Parse a required string environment variable that has a legacy alias.
macro_rules! require_env_either {
    ($var_name:expr, $alias:expr) => {
        env::var($var_name).or_else(|_| env::var($alias)).map_err(|_| {
            anyhow!(
                "{} (or {}) must be set in .env or environment",
                $var_name,
                $alias
            )
        })?
    };
}

/// Read an optional string environment variable with a default.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

// ---

/// Short-term relational store settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    // ---
    pub name: String,
    pub username: String,
    pub endpoint: String,
    pub password: String,
    pub port: u16,
    pub pool_max: u32,
}

/// Object storage settings for the long-term archive.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    // ---
    pub bucket_name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Object key of the consolidated archive CSV.
    pub archive_key: String,
}

/// Settings shared by the extract, transform and archive stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // ---
    /// Base URL; plant `n` is fetched from `{plant_api_url}/{n}`.
    pub plant_api_url: String,

    /// Highest plant id polled. Ids `0..=number_of_plants` are fetched.
    pub number_of_plants: u32,

    pub request_timeout_secs: u32,

    /// Raw CSV written by extract and read by transform.
    pub raw_data_path: PathBuf,

    /// Cleaned CSV written by transform and read by load.
    pub clean_data_path: PathBuf,

    pub range_check: RangeCheck,

    /// Rows older than this are moved from the database to the archive.
    pub archive_age_hours: u32,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub addr: SocketAddr,
}

impl DatabaseConfig {
    /// Required:
    /// - `DATABASE_NAME`, `DATABASE_USERNAME`, `DATABASE_ENDPOINT`, `DATABASE_PASSWORD`
    ///
    /// Optional:
    /// - `DATABASE_PORT` (default: 5432)
    /// - `DB_POOL_MAX` (default: 5)
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(DatabaseConfig {
            name: require_env!("DATABASE_NAME"),
            username: require_env!("DATABASE_USERNAME"),
            endpoint: require_env!("DATABASE_ENDPOINT"),
            password: require_env!("DATABASE_PASSWORD"),
            port: parse_env!("DATABASE_PORT", u16, 5432),
            pool_max: parse_env_u32!("DB_POOL_MAX", 5),
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        // ---
        PgConnectOptions::new()
            .host(&self.endpoint)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.name)
    }

    /// Open a connection pool to the short-term store.
    pub async fn connect(&self) -> Result<PgPool> {
        // ---
        tracing::info!(
            "Attempting to connect to database {} at {}:{}",
            self.name,
            self.endpoint,
            self.port
        );
        let pool = PgPoolOptions::new()
            .max_connections(self.pool_max)
            .connect_with(self.connect_options())
            .await
            .map_err(|e| anyhow!("Failed to connect to database '{}': {}", self.name, e))?;
        tracing::info!("Successfully connected to database");
        Ok(pool)
    }

    pub fn log_config(&self) {
        // ---
        tracing::info!("Database configuration:");
        tracing::info!("  DATABASE_NAME     : {}", self.name);
        tracing::info!("  DATABASE_USERNAME : {}", self.username);
        tracing::info!("  DATABASE_ENDPOINT : {}:{}", self.endpoint, self.port);
        tracing::info!("  DATABASE_PASSWORD : ****");
        tracing::info!("  DB_POOL_MAX       : {}", self.pool_max);
    }
}

impl StorageConfig {
    /// Required:
    /// - `BUCKET_NAME`
    /// - `ACCESS_KEY_ID` (or `ACCESS_KEY`)
    /// - `SECRET_ACCESS_KEY` (or `SECRET_KEY`)
    ///
    /// Optional:
    /// - `AWS_REGION` (default: `eu-west-2`)
    /// - `ARCHIVE_KEY` (default: `full_s3_data.csv`)
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(StorageConfig {
            bucket_name: require_env!("BUCKET_NAME"),
            access_key_id: require_env_either!("ACCESS_KEY_ID", "ACCESS_KEY"),
            secret_access_key: require_env_either!("SECRET_ACCESS_KEY", "SECRET_KEY"),
            region: env_or!("AWS_REGION", "eu-west-2"),
            archive_key: env_or!("ARCHIVE_KEY", "full_s3_data.csv"),
        })
    }

    pub fn log_config(&self) {
        // ---
        let masked_key = match self.access_key_id.get(..4) {
            Some(prefix) => format!("{prefix}****"),
            None => "****".to_string(),
        };

        tracing::info!("Storage configuration:");
        tracing::info!("  BUCKET_NAME   : {}", self.bucket_name);
        tracing::info!("  ACCESS_KEY_ID : {}", masked_key);
        tracing::info!("  AWS_REGION    : {}", self.region);
        tracing::info!("  ARCHIVE_KEY   : {}", self.archive_key);
    }
}

impl PipelineConfig {
    /// All settings are optional:
    /// - `PLANT_API_URL` (default: the museum plants API)
    /// - `NUMBER_OF_PLANTS` (default: 50)
    /// - `REQUEST_TIMEOUT_SECS` (default: 5)
    /// - `RAW_DATA_PATH` (default: `data/plant_data.csv`)
    /// - `CLEAN_DATA_PATH` (default: `data/clean_plant_data.csv`)
    /// - `RANGE_CHECK` (`strict` | `legacy`, default: `strict`)
    /// - `ARCHIVE_AGE_HOURS` (default: 24)
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(PipelineConfig {
            plant_api_url: env_or!(
                "PLANT_API_URL",
                "https://data-eng-plants-api.herokuapp.com/plants"
            ),
            number_of_plants: parse_env_u32!("NUMBER_OF_PLANTS", 50),
            request_timeout_secs: parse_env_u32!("REQUEST_TIMEOUT_SECS", 5),
            raw_data_path: PathBuf::from(env_or!("RAW_DATA_PATH", "data/plant_data.csv")),
            clean_data_path: PathBuf::from(env_or!(
                "CLEAN_DATA_PATH",
                "data/clean_plant_data.csv"
            )),
            range_check: parse_env!("RANGE_CHECK", RangeCheck, RangeCheck::Strict),
            archive_age_hours: parse_env_u32!("ARCHIVE_AGE_HOURS", 24),
        })
    }

    pub fn log_config(&self) {
        // ---
        tracing::info!("Pipeline configuration:");
        tracing::info!("  PLANT_API_URL        : {}", self.plant_api_url);
        tracing::info!("  NUMBER_OF_PLANTS     : {}", self.number_of_plants);
        tracing::info!("  REQUEST_TIMEOUT_SECS : {}", self.request_timeout_secs);
        tracing::info!("  RAW_DATA_PATH        : {}", self.raw_data_path.display());
        tracing::info!("  CLEAN_DATA_PATH      : {}", self.clean_data_path.display());
        tracing::info!("  RANGE_CHECK          : {}", self.range_check);
        tracing::info!("  ARCHIVE_AGE_HOURS    : {}", self.archive_age_hours);
    }
}

impl DashboardConfig {
    /// Optional:
    /// - `DASHBOARD_ADDR` (default: `0.0.0.0:8080`)
    pub fn from_env() -> Result<Self> {
        // ---
        let addr = parse_env!(
            "DASHBOARD_ADDR",
            SocketAddr,
            SocketAddr::from(([0, 0, 0, 0], 8080))
        );
        Ok(DashboardConfig { addr })
    }
}
