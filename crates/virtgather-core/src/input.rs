//! Target list loader

use std::path::Path;

use virtgather_schema::TargetRecord;

use crate::error::InputError;

/// Load the JSON array of target records from `path`
///
/// The file is read fully into memory once per run.
///
/// # Errors
/// Returns an [`InputError`] when the file cannot be read or does not
/// contain a JSON array of objects. Both are fatal for the run.
pub fn load_targets(path: &Path) -> Result<Vec<TargetRecord>, InputError> {
    let raw = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}
