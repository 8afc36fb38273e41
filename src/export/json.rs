use crate::errors::AppResult;
use crate::export::model::ExportRow;
use std::path::Path;

/// Write the rows as pretty-printed JSON.
pub fn write_json(path: &Path, rows: &[ExportRow]) -> AppResult<()> {
    let json = serde_json::to_string_pretty(rows)?;
    std::fs::write(path, json)?;
    Ok(())
}
