use crate::cli::commands::open_store;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::clock::Clock;
use crate::errors::AppResult;
use crate::export::fs_utils::ensure_writable;
use crate::export::{ExportOutcome, Exporter, notify_export_success};
use crate::ui::messages::warning;
use std::path::PathBuf;
use std::sync::Arc;

pub fn handle(cmd: &Commands, cfg: &Config, clock: Arc<dyn Clock>) -> AppResult<()> {
    if let Commands::Export {
        format,
        file,
        force,
    } = cmd
    {
        let store = open_store(cfg)?;
        let exporter = Exporter::new(store, Arc::new(cfg.directory()), &cfg.export_dir);

        let path = match file {
            Some(f) => PathBuf::from(f),
            None => PathBuf::from(&cfg.export_dir)
                .join(Exporter::file_name_for(clock.now(), *format)),
        };
        ensure_writable(&path, *force)?;

        match exporter.export_to(&path, *format)? {
            ExportOutcome::Written { path, .. } => {
                notify_export_success(&format.as_str().to_uppercase(), &path)
            }
            ExportOutcome::NothingToExport => warning("No attendance records to export."),
        }
    }
    Ok(())
}
