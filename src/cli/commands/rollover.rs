use crate::cli::commands::{build_scheduler, open_store};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::clock::Clock;
use crate::core::rollover::RolloverOutcome;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{info, success, warning};
use std::sync::Arc;

pub fn handle(cmd: &Commands, cfg: &Config, clock: Arc<dyn Clock>) -> AppResult<()> {
    if let Commands::Rollover { next, now } = cmd {
        if *next {
            let schedule = cfg.rollover_schedule()?;
            let (at, delay) = schedule.delay_until_next(clock.now());
            let local = at.with_timezone(&schedule.offset());
            info(format!(
                "Next rollover: {} ({}h {}m from now)",
                local.format("%A %Y-%m-%d %H:%M %:z"),
                delay.as_secs() / 3600,
                (delay.as_secs() % 3600) / 60
            ));
        }

        if *now {
            let scheduler = build_scheduler(cfg, open_store(cfg)?, Arc::clone(&clock))?;
            match scheduler.fire(clock.now()) {
                RolloverOutcome::Completed {
                    report,
                    rows,
                    reset,
                    deleted,
                } => success(format!(
                    "Rollover completed: {rows} row(s) exported to {}, {reset} total(s) reset, {deleted} record(s) removed.",
                    report.display()
                )),
                RolloverOutcome::NothingToExport => {
                    warning("No attendance records to export; nothing was reset.")
                }
                RolloverOutcome::ExportFailed(e) => return Err(AppError::ExportFailed(e)),
                RolloverOutcome::ResetFailed { report, error } => {
                    return Err(AppError::Other(format!(
                        "export written to {} but reset failed: {error}",
                        report.display()
                    )));
                }
            }
        }
    }
    Ok(())
}
