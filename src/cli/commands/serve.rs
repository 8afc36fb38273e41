use crate::cli::commands::{build_monitor, build_scheduler, open_store};
use crate::config::Config;
use crate::core::clock::SystemClock;
use crate::errors::AppResult;
use crate::ui::messages::info;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber for the daemon. `SHIFTCLOCK_LOG` overrides
/// the default `info` filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SHIFTCLOCK_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run the expiration monitor and the rollover scheduler until Ctrl-C.
pub fn handle(cfg: &Config) -> AppResult<()> {
    init_tracing();

    let store = open_store(cfg)?;
    let clock = Arc::new(SystemClock);
    let monitor = Arc::new(build_monitor(cfg, Arc::clone(&store), clock.clone())?);
    let scheduler = Arc::new(build_scheduler(cfg, store, clock)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    info(format!(
        "shiftclock serving {} (sweep every {} min); press Ctrl-C to stop.",
        cfg.database, cfg.sweep_interval_minutes
    ));

    runtime.block_on(async {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let monitor_task = tokio::spawn(monitor.run(
            cfg.initial_sweep_delay(),
            cfg.sweep_interval(),
            shutdown_rx.clone(),
        ));
        let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C, shutting down");
        }
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(true);

        for (name, task) in [("monitor", monitor_task), ("scheduler", scheduler_task)] {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = %e, "task ended abnormally");
            }
        }
    });

    info("shiftclock stopped.");
    Ok(())
}
