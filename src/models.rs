//! Data models for the plant sensor pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---

/// Column order of every tabular file the pipeline reads or writes.
pub const COLUMNS: [&str; 17] = [
    "plant_name",
    "scientific_name",
    "api_id",
    "cycle",
    "last_watered",
    "soil_moisture",
    "temperature",
    "sunlight",
    "recording_taken",
    "longitude",
    "latitude",
    "country",
    "continent",
    "botanist_name",
    "email",
    "phone",
    "error",
];

/// Output format for `last_watered`; accepted again by the RFC-1123 parser.
pub const LAST_WATERED_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format of `recording_taken` on input and output.
pub const RECORDING_TAKEN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row as produced by extraction, or as stored in any of the CSV files.
///
/// Every column is optional: error rows usually carry nothing but `api_id`
/// and `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    // ---
    pub plant_name: Option<String>,
    pub scientific_name: Option<String>,
    pub api_id: Option<i64>,
    pub cycle: Option<String>,
    pub last_watered: Option<String>,
    pub soil_moisture: Option<String>,
    pub temperature: Option<String>,
    pub sunlight: Option<String>,
    pub recording_taken: Option<String>,
    pub longitude: Option<String>,
    pub latitude: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub botanist_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub error: Option<String>,
}

impl RawReading {
    /// Build an extraction error row carrying only the plant id and reason.
    pub fn error_row(api_id: i64, reason: impl Into<String>) -> Self {
        // ---
        RawReading {
            api_id: Some(api_id),
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// A reading that survived every transform pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedReading {
    // ---
    pub api_id: Option<i64>,
    pub plant_name: Option<String>,
    pub scientific_name: Option<String>,
    pub cycle: Option<String>,
    pub last_watered: NaiveDateTime,
    pub soil_moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub sunlight: Option<String>,
    pub recording_taken: NaiveDateTime,
    pub longitude: f64,
    pub latitude: f64,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub botanist_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CleanedReading {
    /// Render back to the tabular row shape, with an empty error column.
    pub fn to_raw(&self) -> RawReading {
        // ---
        RawReading {
            plant_name: self.plant_name.clone(),
            scientific_name: self.scientific_name.clone(),
            api_id: self.api_id,
            cycle: self.cycle.clone(),
            last_watered: Some(self.last_watered.format(LAST_WATERED_FORMAT).to_string()),
            soil_moisture: self.soil_moisture.map(|v| v.to_string()),
            temperature: self.temperature.map(|v| v.to_string()),
            sunlight: self.sunlight.clone(),
            recording_taken: Some(
                self.recording_taken
                    .format(RECORDING_TAKEN_FORMAT)
                    .to_string(),
            ),
            longitude: Some(self.longitude.to_string()),
            latitude: Some(self.latitude.to_string()),
            country: self.country.clone(),
            continent: self.continent.clone(),
            botanist_name: self.botanist_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            error: None,
        }
    }
}

/// A row tagged by extraction with an error reason. Passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    row: RawReading,
}

impl ErrorRecord {
    /// Wrap `row` if it carries an error tag, otherwise hand it back.
    pub fn from_raw(row: RawReading) -> Result<Self, RawReading> {
        // ---
        if row.error.is_some() {
            Ok(ErrorRecord { row })
        } else {
            Err(row)
        }
    }

    pub fn api_id(&self) -> Option<i64> {
        self.row.api_id
    }

    pub fn reason(&self) -> &str {
        self.row.error.as_deref().unwrap_or_default()
    }

    pub fn as_raw(&self) -> &RawReading {
        &self.row
    }
}

/// Output row of the transform: either cleaned data or a passthrough error.
#[derive(Debug, Clone, PartialEq)]
pub enum PlantRecord {
    Clean(CleanedReading),
    Error(ErrorRecord),
}

impl PlantRecord {
    pub fn is_error(&self) -> bool {
        matches!(self, PlantRecord::Error(_))
    }

    pub fn to_raw(&self) -> RawReading {
        // ---
        match self {
            PlantRecord::Clean(reading) => reading.to_raw(),
            PlantRecord::Error(record) => record.as_raw().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;

    fn create_test_cleaned_reading() -> CleanedReading {
        // ---
        CleanedReading {
            api_id: Some(7),
            plant_name: Some("Venus flytrap".to_string()),
            scientific_name: Some("Dionaea muscipula".to_string()),
            cycle: None,
            last_watered: NaiveDate::from_ymd_opt(2023, 8, 29)
                .unwrap()
                .and_hms_opt(13, 24, 30)
                .unwrap(),
            soil_moisture: Some(31.5),
            temperature: None,
            sunlight: Some("['full sun']".to_string()),
            recording_taken: NaiveDate::from_ymd_opt(2023, 8, 30)
                .unwrap()
                .and_hms_opt(9, 5, 1)
                .unwrap(),
            longitude: -19.32556,
            latitude: 12.0,
            country: Some("BR".to_string()),
            continent: Some("America".to_string()),
            botanist_name: Some("Carl Linnaeus".to_string()),
            email: Some("carl.linnaeus@lnhm.co.uk".to_string()),
            phone: Some("(146)994-1635x35992".to_string()),
        }
    }

    #[test]
    fn test_cleaned_reading_renders_timestamps() {
        // ---
        let raw = create_test_cleaned_reading().to_raw();

        assert_eq!(
            raw.last_watered.as_deref(),
            Some("Tue, 29 Aug 2023 13:24:30 GMT")
        );
        assert_eq!(raw.recording_taken.as_deref(), Some("2023-08-30 09:05:01"));
    }

    #[test]
    fn test_cleaned_reading_renders_numbers() {
        // ---
        let raw = create_test_cleaned_reading().to_raw();

        assert_eq!(raw.soil_moisture.as_deref(), Some("31.5"));
        assert_eq!(raw.temperature, None);
        assert_eq!(raw.longitude.as_deref(), Some("-19.32556"));
        assert_eq!(raw.latitude.as_deref(), Some("12"));
        assert_eq!(raw.error, None);
    }

    #[test]
    fn test_error_record_requires_error_tag() {
        // ---
        let tagged = RawReading::error_row(4, "Missing temperature reading.");
        let record = ErrorRecord::from_raw(tagged.clone()).unwrap();
        assert_eq!(record.api_id(), Some(4));
        assert_eq!(record.reason(), "Missing temperature reading.");
        assert_eq!(PlantRecord::Error(record).to_raw(), tagged);

        let untagged = RawReading {
            plant_name: Some("Cactus".to_string()),
            ..Default::default()
        };
        assert!(ErrorRecord::from_raw(untagged).is_err());
    }
}
