//! Auxiliary mapping files.
//!
//! Mapping files are small CSVs loaded once before a run and read-only
//! afterwards. A missing file is never fatal; a present but unusable one is.

use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::parse_csv_file_auto;
use crate::error::{LoadError, LoadResult};
use crate::models::SourceRow;

/// Load a two-column `source_id,target_value` table.
///
/// The header row is skipped, keys and values are trimmed and rows with a
/// blank key are ignored. A missing file yields an empty table.
pub fn load_mapping(path: &Path) -> LoadResult<HashMap<String, String>> {
    if !path.exists() {
        warn!("Mapping file {} not found, continuing without it", path.display());
        return Ok(HashMap::new());
    }

    let parsed = parse_csv_file_auto(path)?;
    if parsed.headers.len() < 2 {
        return Err(LoadError::MalformedMapping {
            path: path.to_path_buf(),
            reason: format!("expected two columns, found {}", parsed.headers.len()),
        });
    }

    let key_col = &parsed.headers[0];
    let value_col = &parsed.headers[1];
    let table: HashMap<String, String> = parsed
        .rows
        .iter()
        .filter_map(|row| {
            let key = row.text(key_col)?;
            Some((key, row.text_or(value_col, "")))
        })
        .collect();

    info!("Loaded {} mappings from {}", table.len(), path.display());
    Ok(table)
}

/// Load a mapping file as rows, requiring the given columns.
///
/// A missing file yields no rows.
pub fn load_records(path: &Path, required: &[&str]) -> LoadResult<Vec<SourceRow>> {
    if !path.exists() {
        warn!("Mapping file {} not found, continuing without it", path.display());
        return Ok(Vec::new());
    }

    let parsed = parse_csv_file_auto(path)?;
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !parsed.headers.iter().any(|h| h == col))
        .collect();

    if !missing.is_empty() {
        return Err(LoadError::MalformedMapping {
            path: path.to_path_buf(),
            reason: format!("missing column(s): {}", missing.join(", ")),
        });
    }

    Ok(parsed.rows)
}
