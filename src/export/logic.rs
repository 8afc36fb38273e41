// src/export/logic.rs

use crate::core::roles::MemberDirectory;
use crate::core::store::RecordStore;
use crate::errors::{AppError, AppResult};
use crate::export::ExportFormat;
use crate::export::csv::write_csv;
use crate::export::json::write_json;
use crate::export::model::{ExportRow, round_hours};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of an export run.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    NothingToExport,
}

/// Renders every attendance record into a tabular report.
#[derive(Clone)]
pub struct Exporter {
    store: Arc<dyn RecordStore>,
    directory: Arc<dyn MemberDirectory>,
    export_dir: PathBuf,
}

impl Exporter {
    pub fn new(
        store: Arc<dyn RecordStore>,
        directory: Arc<dyn MemberDirectory>,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            directory,
            export_dir: export_dir.into(),
        }
    }

    /// File name of the export for a given day; the extension follows `format`.
    pub fn file_name_for(now: DateTime<Utc>, format: ExportFormat) -> String {
        format!("clock_records_{}.{}", now.format("%Y-%m-%d"), format.as_str())
    }

    /// One row per record, in member id order.
    pub fn rows(&self) -> AppResult<Vec<ExportRow>> {
        let records = self.store.list_all()?;
        let mut rows = Vec::with_capacity(records.len());
        for rec in records {
            let display_name = match self.directory.display_name(&rec.member_id) {
                Ok(Some(name)) => name,
                Ok(None) => "Unknown".to_string(),
                Err(e) => {
                    warn!(member = %rec.member_id, error = %e, "display name lookup failed");
                    "Unknown".to_string()
                }
            };
            rows.push(ExportRow {
                member_id: rec.member_id.to_string(),
                display_name,
                total_hours: round_hours(rec.accrued_hours),
            });
        }
        Ok(rows)
    }

    /// Weekly CSV export into the export directory.
    pub fn export(&self, now: DateTime<Utc>) -> AppResult<ExportOutcome> {
        let path = self.export_dir.join(Self::file_name_for(now, ExportFormat::Csv));
        self.export_to(&path, ExportFormat::Csv)
    }

    /// Export to an explicit file. Every failure is reported as
    /// [`AppError::ExportFailed`].
    pub fn export_to(&self, path: &Path, format: ExportFormat) -> AppResult<ExportOutcome> {
        let rows = self
            .rows()
            .map_err(|e| AppError::ExportFailed(format!("reading records: {e}")))?;

        if rows.is_empty() {
            info!("no attendance records found, nothing to export");
            return Ok(ExportOutcome::NothingToExport);
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::ExportFailed(format!("creating {}: {e}", parent.display()))
            })?;
        }

        let written = match format {
            ExportFormat::Csv => write_csv(path, &rows),
            ExportFormat::Json => write_json(path, &rows),
        };
        written.map_err(|e| AppError::ExportFailed(format!("writing {}: {e}", path.display())))?;

        info!(path = %path.display(), rows = rows.len(), format = format.as_str(), "export written");
        Ok(ExportOutcome::Written {
            path: path.to_path_buf(),
            rows: rows.len(),
        })
    }
}
