//! CSV reading and writing for plant datasets.
//!
//! All files share the header in [`COLUMNS`]. Writes to a path go through a
//! temporary file in the same directory and replace the target in one rename,
//! so a failed run never leaves a half-written table behind.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::models::{RawReading, COLUMNS};

// ---

/// Read a dataset file. Rows that do not fit the schema are skipped.
pub fn read_dataset(path: &Path) -> Result<Vec<RawReading>> {
    // ---
    if !path.exists() {
        return Err(PipelineError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    let rows = read_dataset_from(file)?;
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read a dataset from any reader. The header row is required.
pub fn read_dataset_from<R: Read>(reader: R) -> Result<Vec<RawReading>> {
    // ---
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    // fail on an unreadable header, not just a bad row
    rdr.headers()?;

    let mut rows = Vec::new();
    for (index, result) in rdr.deserialize::<RawReading>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Skipping malformed row {}: {}", index + 1, e),
        }
    }
    Ok(rows)
}

/// Write `rows` to `path`, replacing whatever was there.
pub fn write_dataset(path: &Path, rows: &[RawReading]) -> Result<()> {
    // ---
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write_dataset_to(&mut tmp, rows)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PipelineError::Io(e.error))?;

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Write the header and `rows` to any writer.
pub fn write_dataset_to<W: Write>(writer: W, rows: &[RawReading]) -> Result<()> {
    // ---
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
