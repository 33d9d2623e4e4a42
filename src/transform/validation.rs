//! Numeric coercion and physical range checks for sensor readings.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use tracing::{debug, info};

use super::timestamps::TimedReading;
use crate::models::CleanedReading;

// ---

/// Plausible soil moisture, in percent.
pub const SOIL_MOISTURE_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Plausible greenhouse temperature, in degrees Celsius.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = -10.0..=39.0;

/// How out-of-range sensor values are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeCheck {
    /// Null any value outside its inclusive range.
    #[default]
    Strict,
    /// Keep every value. Matches the historical output, whose range
    /// condition was always true.
    Legacy,
}

impl FromStr for RangeCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(RangeCheck::Strict),
            "legacy" => Ok(RangeCheck::Legacy),
            other => Err(format!("unknown range check '{other}' (expected strict|legacy)")),
        }
    }
}

impl fmt::Display for RangeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeCheck::Strict => write!(f, "strict"),
            RangeCheck::Legacy => write!(f, "legacy"),
        }
    }
}

/// Parse a numeric cell. Blank, non-numeric and non-finite values are `None`.
pub(crate) fn parse_number(text: Option<&str>) -> Option<f64> {
    // ---
    let value = text?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a sensor cell. A blank cell is an absent reading, `Some(None)`; a
/// present value that is not a finite number is `None`.
fn parse_sensor(text: Option<&str>) -> Option<Option<f64>> {
    // ---
    match text.map(str::trim) {
        None | Some("") => Some(None),
        Some(value) => parse_number(Some(value)).map(Some),
    }
}

/// Convert soil moisture, temperature, longitude and latitude to numbers.
///
/// A row with a non-numeric sensor value, or with a missing or non-numeric
/// coordinate, is removed entirely. Blank sensor cells stay absent, so rows
/// whose readings were nulled by the range check survive another pass.
pub fn coerce_numeric(rows: Vec<TimedReading>) -> Vec<CleanedReading> {
    // ---
    let before = rows.len();
    let cleaned: Vec<CleanedReading> = rows.into_iter().filter_map(to_numeric).collect();

    info!(
        "Numeric coercion: kept {} of {} rows",
        cleaned.len(),
        before
    );
    cleaned
}

fn to_numeric(reading: TimedReading) -> Option<CleanedReading> {
    // ---
    let TimedReading {
        row,
        last_watered,
        recording_taken,
    } = reading;

    let numbers = (
        parse_sensor(row.soil_moisture.as_deref()),
        parse_sensor(row.temperature.as_deref()),
        parse_number(row.longitude.as_deref()),
        parse_number(row.latitude.as_deref()),
    );
    let (Some(soil_moisture), Some(temperature), Some(longitude), Some(latitude)) = numbers else {
        debug!(
            "Dropping api_id {:?}: non-numeric value in {:?}",
            row.api_id, numbers
        );
        return None;
    };

    Some(CleanedReading {
        api_id: row.api_id,
        plant_name: row.plant_name,
        scientific_name: row.scientific_name,
        cycle: row.cycle,
        last_watered,
        soil_moisture,
        temperature,
        sunlight: row.sunlight,
        recording_taken,
        longitude,
        latitude,
        country: row.country,
        continent: row.continent,
        botanist_name: row.botanist_name,
        email: row.email,
        phone: row.phone,
    })
}

/// Null sensor values outside their physical range. Returns how many values
/// were nulled.
pub fn validate_ranges(rows: &mut [CleanedReading], check: RangeCheck) -> usize {
    // ---
    if check == RangeCheck::Legacy {
        return 0;
    }

    let mut nulled = 0;
    for reading in rows.iter_mut() {
        if let Some(value) = reading.soil_moisture {
            if !SOIL_MOISTURE_RANGE.contains(&value) {
                debug!("api_id {:?}: soil moisture {} out of range", reading.api_id, value);
                reading.soil_moisture = None;
                nulled += 1;
            }
        }
        if let Some(value) = reading.temperature {
            if !TEMPERATURE_RANGE.contains(&value) {
                debug!("api_id {:?}: temperature {} out of range", reading.api_id, value);
                reading.temperature = None;
                nulled += 1;
            }
        }
    }
    nulled
}
