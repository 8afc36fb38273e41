use crate::errors::AppResult;
use crate::export::model::{ExportRow, get_headers};
use csv::Writer;
use std::path::Path;

/// Write the rows as CSV (`memberId,displayName,totalHours`).
pub fn write_csv(path: &Path, rows: &[ExportRow]) -> AppResult<()> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record(get_headers())?;

    for row in rows {
        wtr.write_record(&[
            row.member_id.clone(),
            row.display_name.clone(),
            row.total_hours.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
