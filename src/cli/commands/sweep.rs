use crate::cli::commands::{build_monitor, open_store};
use crate::config::Config;
use crate::core::clock::Clock;
use crate::core::monitor::SweepOutcome;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};
use std::sync::Arc;

/// Run a single expiration sweep.
pub fn handle(cfg: &Config, clock: Arc<dyn Clock>) -> AppResult<()> {
    let monitor = build_monitor(cfg, open_store(cfg)?, clock)?;

    match monitor.sweep()? {
        SweepOutcome::AlreadyRunning => warning("A sweep is already running."),
        SweepOutcome::Completed(report) => {
            info(format!(
                "Examined {} open session(s): {} within limit, {} without a qualifying role.",
                report.examined, report.within_limit, report.skipped_no_role
            ));
            for member in &report.expired {
                warning(format!("Session of {member} expired and was closed without credit."));
            }
            if report.failures > 0 {
                warning(format!("{} member(s) could not be checked.", report.failures));
            }
            success("Sweep completed.");
        }
    }
    Ok(())
}
