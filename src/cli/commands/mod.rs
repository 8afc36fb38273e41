//! Command handlers plus the wiring shared between them.

pub mod channels;
pub mod clock;
pub mod config;
pub mod db;
pub mod export;
pub mod hours;
pub mod init;
pub mod log;
pub mod rollover;
pub mod serve;
pub mod status;
pub mod sweep;

use crate::config::Config;
use crate::core::clock::Clock;
use crate::core::monitor::ExpirationMonitor;
use crate::core::notify::LogNotifier;
use crate::core::rollover::RolloverScheduler;
use crate::core::state_machine::AttendanceStateMachine;
use crate::db::store::SqliteStore;
use crate::errors::AppResult;
use crate::export::Exporter;
use std::path::Path;
use std::sync::Arc;

pub(crate) fn open_store(cfg: &Config) -> AppResult<Arc<SqliteStore>> {
    Ok(Arc::new(SqliteStore::open(Path::new(&cfg.database))?))
}

pub(crate) fn build_monitor(
    cfg: &Config,
    store: Arc<SqliteStore>,
    clock: Arc<dyn Clock>,
) -> AppResult<ExpirationMonitor> {
    let notifier = Arc::new(LogNotifier::with_audit(Arc::clone(&store)));
    let machine = AttendanceStateMachine::new(store);
    Ok(ExpirationMonitor::new(
        machine,
        Arc::new(cfg.directory()),
        notifier,
        cfg.role_limits()?,
        clock,
    )
    .notify_member_on_expiry(cfg.notify_member_on_expiry))
}

pub(crate) fn build_scheduler(
    cfg: &Config,
    store: Arc<SqliteStore>,
    clock: Arc<dyn Clock>,
) -> AppResult<RolloverScheduler> {
    let notifier = Arc::new(LogNotifier::with_audit(Arc::clone(&store)));
    let exporter = Exporter::new(store.clone(), Arc::new(cfg.directory()), &cfg.export_dir);
    Ok(
        RolloverScheduler::new(cfg.rollover_schedule()?, store, exporter, notifier, clock)
            .retention(cfg.retention)
            .keep_exports(cfg.keep_exports),
    )
}
