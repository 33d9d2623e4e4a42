//! Timestamp reconciliation pass.
//!
//! Resolves `last_watered` and `recording_taken` for every row, then splits
//! the batch into error rows and rows whose timestamps are usable. Rows are
//! visited in input order because that order feeds the carry-forward cache.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::field_parsers::{parse_canonical_timestamp, parse_rfc1123_timestamp, TimestampCache};
use crate::models::{ErrorRecord, RawReading};

// ---

/// A row whose timestamps both resolved and are correctly ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedReading {
    pub row: RawReading,
    pub last_watered: NaiveDateTime,
    pub recording_taken: NaiveDateTime,
}

/// Split `rows` into (valid rows, error rows).
///
/// Error rows are returned exactly as given. Untagged rows are kept only when
/// `recording_taken >= last_watered`; rows where either timestamp is missing
/// or the ordering is violated are dropped from both outputs.
pub fn reconcile_timestamps(rows: Vec<RawReading>) -> (Vec<TimedReading>, Vec<ErrorRecord>) {
    // ---
    let mut cache = TimestampCache::new();
    let mut timed = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();
    let mut dropped = 0usize;

    for row in rows {
        let last_watered = parse_rfc1123_timestamp(row.last_watered.as_deref());
        let recording_taken = parse_canonical_timestamp(row.recording_taken.as_deref(), &mut cache);

        let row = match ErrorRecord::from_raw(row) {
            Ok(record) => {
                errors.push(record);
                continue;
            }
            Err(row) => row,
        };

        match (last_watered, recording_taken) {
            (Some(last_watered), Some(recording_taken)) if recording_taken >= last_watered => {
                timed.push(TimedReading {
                    row,
                    last_watered,
                    recording_taken,
                });
            }
            _ => {
                dropped += 1;
                debug!(
                    "Dropping api_id {:?}: last_watered={:?} recording_taken={:?}",
                    row.api_id, last_watered, recording_taken
                );
            }
        }
    }

    info!(
        "Timestamp reconciliation: {} valid, {} errors, {} dropped",
        timed.len(),
        errors.len(),
        dropped
    );

    (timed, errors)
}
