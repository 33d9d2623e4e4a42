//! Transform stage: turns the raw extracted dataset into one clean table.
//!
//! Pass order over a fully loaded batch:
//! 1. timestamp reconciliation (splits error rows from usable rows)
//! 2. numeric coercion of sensor and coordinate columns
//! 3. range validation of sensor values
//! 4. name cleaning
//! 5. duplicate plant removal (first seen wins)
//! 6. botanist contact validation
//!
//! Error rows skip passes 2 to 6 and are placed ahead of the clean rows in the
//! output. Per-row problems never abort the batch; only reading the input or
//! writing the output can fail.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::dataset::{read_dataset, write_dataset};
use crate::error::Result;
use crate::models::{CleanedReading, PlantRecord, RawReading};

pub mod field_parsers;
pub mod timestamps;
pub mod validation;

pub use field_parsers::{
    extract_email, extract_phone_number, parse_canonical_timestamp, parse_rfc1123_timestamp,
    strip_comma, strip_list_formatting, TimestampCache,
};
pub use timestamps::{reconcile_timestamps, TimedReading};
pub use validation::{coerce_numeric, validate_ranges, RangeCheck};

// ---

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    pub range_check: RangeCheck,
}

/// Row counts for one transform run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub input_rows: usize,
    pub error_rows: usize,
    pub timestamp_drops: usize,
    pub numeric_drops: usize,
    pub duplicate_drops: usize,
    pub nulled_values: usize,
    pub defanged_contacts: usize,
    pub clean_rows: usize,
}

impl TransformReport {
    pub fn output_rows(&self) -> usize {
        self.error_rows + self.clean_rows
    }
}

/// Run every pass over `rows` and return error rows followed by clean rows.
pub fn transform_dataset(
    rows: Vec<RawReading>,
    options: &TransformOptions,
) -> (Vec<PlantRecord>, TransformReport) {
    // ---
    let mut report = TransformReport {
        input_rows: rows.len(),
        ..Default::default()
    };

    let (timed, errors) = reconcile_timestamps(rows);
    report.error_rows = errors.len();
    report.timestamp_drops = report.input_rows - errors.len() - timed.len();

    let timed_count = timed.len();
    let mut cleaned = coerce_numeric(timed);
    report.numeric_drops = timed_count - cleaned.len();

    report.nulled_values = validate_ranges(&mut cleaned, options.range_check);

    clean_names(&mut cleaned);

    let named_count = cleaned.len();
    let mut cleaned = remove_duplicate_plants(cleaned);
    report.duplicate_drops = named_count - cleaned.len();

    report.defanged_contacts = verify_botanist_contacts(&mut cleaned);
    report.clean_rows = cleaned.len();

    let records = errors
        .into_iter()
        .map(PlantRecord::Error)
        .chain(cleaned.into_iter().map(PlantRecord::Clean))
        .collect();

    info!(
        "Transform complete: {} in, {} errors, {} clean ({} timestamp drops, {} numeric drops, {} duplicates)",
        report.input_rows,
        report.error_rows,
        report.clean_rows,
        report.timestamp_drops,
        report.numeric_drops,
        report.duplicate_drops
    );

    (records, report)
}

/// Strip commas from plant names and list syntax from scientific names.
pub fn clean_names(rows: &mut [CleanedReading]) {
    // ---
    for reading in rows.iter_mut() {
        reading.plant_name = strip_comma(reading.plant_name.as_deref());
        reading.scientific_name = reading
            .scientific_name
            .as_deref()
            .map(strip_list_formatting);
    }
}

/// Keep the first reading for each plant name; later ones are discarded.
pub fn remove_duplicate_plants(rows: Vec<CleanedReading>) -> Vec<CleanedReading> {
    // ---
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|reading| {
            let first = seen.insert(reading.plant_name.clone());
            if !first {
                debug!(
                    "Dropping duplicate plant {:?} (api_id {:?})",
                    reading.plant_name, reading.api_id
                );
            }
            first
        })
        .collect()
}

/// Null botanist emails and phone numbers that are not well formed. Returns
/// how many fields were nulled.
pub fn verify_botanist_contacts(rows: &mut [CleanedReading]) -> usize {
    // ---
    let mut defanged = 0;
    for reading in rows.iter_mut() {
        let email = extract_email(reading.email.as_deref());
        if email.is_none() && reading.email.is_some() {
            debug!("api_id {:?}: invalid email {:?}", reading.api_id, reading.email);
            defanged += 1;
        }
        reading.email = email;

        let phone = extract_phone_number(reading.phone.as_deref());
        if phone.is_none() && reading.phone.is_some() {
            debug!("api_id {:?}: invalid phone {:?}", reading.api_id, reading.phone);
            defanged += 1;
        }
        reading.phone = phone;
    }
    defanged
}

/// Read `input`, transform it and write the result to `output`.
///
/// The output replaces any existing file at that path in one step.
pub fn run_transform(
    input: &Path,
    output: &Path,
    options: &TransformOptions,
) -> Result<TransformReport> {
    // ---
    info!(
        "Transforming {} -> {} (range check: {})",
        input.display(),
        output.display(),
        options.range_check
    );

    let rows = read_dataset(input)?;
    let (records, report) = transform_dataset(rows, options);

    let table: Vec<RawReading> = records.iter().map(PlantRecord::to_raw).collect();
    write_dataset(output, &table)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn create_test_row(plant_name: &str, api_id: i64, minute: u32) -> RawReading {
        // ---
        RawReading {
            plant_name: Some(plant_name.to_string()),
            scientific_name: Some("['Ficus elastica']".to_string()),
            api_id: Some(api_id),
            cycle: Some("Perennial".to_string()),
            last_watered: Some("Tue, 29 Aug 2023 13:24:30 GMT".to_string()),
            soil_moisture: Some("33.2".to_string()),
            temperature: Some("13.1".to_string()),
            sunlight: Some("['full sun']".to_string()),
            recording_taken: Some(format!("2023-08-30 09:{minute:02}:01")),
            longitude: Some("-19.32556".to_string()),
            latitude: Some("-41.25528".to_string()),
            country: Some("BR".to_string()),
            continent: Some("America".to_string()),
            botanist_name: Some("Gertrude Jekyll".to_string()),
            email: Some("gertrude.jekyll@lnhm.co.uk".to_string()),
            phone: Some("001-481-273-3691x127".to_string()),
            error: None,
        }
    }

    fn cleaned(records: &[PlantRecord]) -> Vec<&CleanedReading> {
        // ---
        records
            .iter()
            .filter_map(|r| match r {
                PlantRecord::Clean(c) => Some(c),
                PlantRecord::Error(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_remove_duplicate_plants_keeps_first() {
        // ---
        let (timed, _) = reconcile_timestamps(vec![
            create_test_row("1", 1, 1),
            create_test_row("1", 2, 2),
            create_test_row("1", 3, 3),
        ]);
        let rows = coerce_numeric(timed);
        let first = rows[0].clone();

        let deduplicated = remove_duplicate_plants(rows);

        assert_eq!(deduplicated.len(), 1);
        assert_eq!(deduplicated[0], first);
        assert_eq!(deduplicated[0].api_id, Some(1));
    }

    #[test]
    fn test_clean_names() {
        // ---
        let (timed, _) = reconcile_timestamps(vec![create_test_row("Epipremnum, Aureum", 1, 0)]);
        let mut rows = coerce_numeric(timed);
        clean_names(&mut rows);

        assert_eq!(rows[0].plant_name.as_deref(), Some("Epipremnum Aureum"));
        assert_eq!(rows[0].scientific_name.as_deref(), Some("Ficus elastica"));
        assert_eq!(rows[0].sunlight.as_deref(), Some("['full sun']"));
    }

    #[test]
    fn test_verify_botanist_contacts_defangs_invalid_fields() {
        // ---
        let mut bad = create_test_row("Cactus", 2, 0);
        bad.email = Some("+++++@yahoo.com".to_string());
        bad.phone = Some("I am a fake phone number".to_string());
        let (timed, _) = reconcile_timestamps(vec![create_test_row("Fern", 1, 0), bad]);
        let mut rows = coerce_numeric(timed);

        assert_eq!(verify_botanist_contacts(&mut rows), 2);
        assert!(rows[0].email.is_some());
        assert!(rows[0].phone.is_some());
        assert_eq!(rows[1].email, None);
        assert_eq!(rows[1].phone, None);
        assert_eq!(rows[1].plant_name.as_deref(), Some("Cactus"));
    }

    #[test]
    fn test_error_row_passes_through_whole_transform() {
        // ---
        let timeout = RawReading::error_row(9, "Timeout");
        let (records, report) =
            transform_dataset(vec![timeout.clone()], &TransformOptions::default());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to_raw(), timeout);
        assert_eq!(report.error_rows, 1);
        assert_eq!(report.clean_rows, 0);
    }

    #[test]
    fn test_error_rows_precede_clean_rows() {
        // ---
        let rows = vec![
            create_test_row("Fern", 1, 0),
            RawReading::error_row(2, "Missing temperature reading."),
            create_test_row("Cactus", 3, 1),
            RawReading::error_row(4, "Missing field in data."),
        ];
        let (records, report) = transform_dataset(rows, &TransformOptions::default());

        let kinds: Vec<bool> = records.iter().map(PlantRecord::is_error).collect();
        assert_eq!(kinds, vec![true, true, false, false]);
        assert_eq!(records[0].to_raw().api_id, Some(2));
        assert_eq!(records[1].to_raw().api_id, Some(4));
        assert_eq!(report.output_rows(), 4);
    }

    #[test]
    fn test_report_counts_each_kind_of_drop() {
        // ---
        let mut early = create_test_row("Early", 2, 0);
        early.recording_taken = Some("2023-08-01 00:00:00".to_string());
        let mut wet = create_test_row("Wet", 3, 0);
        wet.soil_moisture = Some("soggy".to_string());
        let mut hot = create_test_row("Hot", 4, 0);
        hot.temperature = Some("45".to_string());

        let rows = vec![
            create_test_row("Fern", 1, 0),
            early,
            wet,
            hot,
            create_test_row("Fern", 5, 0),
        ];
        let (records, report) = transform_dataset(rows, &TransformOptions::default());

        assert_eq!(report.input_rows, 5);
        assert_eq!(report.timestamp_drops, 1);
        assert_eq!(report.numeric_drops, 1);
        assert_eq!(report.duplicate_drops, 1);
        assert_eq!(report.nulled_values, 1);
        assert_eq!(report.clean_rows, 2);

        let clean = cleaned(&records);
        assert_eq!(clean[1].plant_name.as_deref(), Some("Hot"));
        assert_eq!(clean[1].temperature, None);
    }

    #[test]
    fn test_legacy_range_check_keeps_out_of_range_values() {
        // ---
        let mut hot = create_test_row("Hot", 4, 0);
        hot.temperature = Some("45".to_string());
        let options = TransformOptions {
            range_check: RangeCheck::Legacy,
        };
        let (records, report) = transform_dataset(vec![hot], &options);

        assert_eq!(report.nulled_values, 0);
        assert_eq!(cleaned(&records)[0].temperature, Some(45.0));
    }

    #[test]
    fn test_transform_is_idempotent() {
        // ---
        let mut dotted = create_test_row("Rafflesia, arnoldii", 3, 2);
        dotted.phone = Some("+1.434.795.3400".to_string());
        let mut hot = create_test_row("Hot", 4, 3);
        hot.temperature = Some("45".to_string());
        let mut flooded = create_test_row("Flooded", 5, 4);
        flooded.soil_moisture = Some("150".to_string());
        let rows = vec![
            RawReading::error_row(0, "Timeout: The request could not be completed."),
            create_test_row("Venus flytrap", 1, 0),
            create_test_row("Corpse flower", 2, 1),
            dotted,
            hot,
            flooded,
        ];
        let options = TransformOptions::default();

        let (first, first_report) = transform_dataset(rows, &options);
        let first_table: Vec<RawReading> = first.iter().map(PlantRecord::to_raw).collect();
        assert_eq!(first_report.nulled_values, 2);

        let (second, report) = transform_dataset(first_table.clone(), &options);
        let second_table: Vec<RawReading> = second.iter().map(PlantRecord::to_raw).collect();

        assert_eq!(first_table, second_table);
        assert_eq!(report.numeric_drops, 0);
        assert_eq!(report.defanged_contacts, 0);
        assert_eq!(report.nulled_values, 0);
    }

    #[test]
    fn test_duplicates_are_detected_after_name_cleaning() {
        // ---
        let rows = vec![
            create_test_row("Cactus,", 1, 0),
            create_test_row("Cactus", 2, 1),
            create_test_row("Fern", 3, 2),
        ];
        let (records, report) = transform_dataset(rows, &TransformOptions::default());

        let clean = cleaned(&records);
        assert_eq!(report.duplicate_drops, 1);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].plant_name.as_deref(), Some("Cactus"));
        assert_eq!(clean[0].api_id, Some(1));
        assert_eq!(clean[1].plant_name.as_deref(), Some("Fern"));
    }
}
