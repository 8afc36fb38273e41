//! Expiration monitor: periodic sweep over open sessions that force-closes
//! the ones running past their role's time limit.

use crate::core::clock::Clock;
use crate::core::notify::{Channel, Notice, Notifier};
use crate::core::roles::{MemberDirectory, RoleLimits};
use crate::core::state_machine::AttendanceStateMachine;
use crate::errors::{AppError, AppResult};
use crate::models::record::{AttendanceRecord, MemberId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Counters for one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub examined: usize,
    pub expired: Vec<MemberId>,
    pub within_limit: usize,
    pub skipped_no_role: usize,
    /// Sessions closed by someone else between listing and expiring.
    pub closed_concurrently: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// Another sweep was still running; nothing was done.
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberOutcome {
    Expired,
    WithinLimit,
    NoQualifyingRole,
    ClosedConcurrently,
}

pub struct ExpirationMonitor {
    machine: AttendanceStateMachine,
    directory: Arc<dyn MemberDirectory>,
    notifier: Arc<dyn Notifier>,
    limits: RoleLimits,
    clock: Arc<dyn Clock>,
    notify_member: bool,
    in_progress: AtomicBool,
}

/// Clears the in-progress flag when the sweep ends, even on early return.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ExpirationMonitor {
    pub fn new(
        machine: AttendanceStateMachine,
        directory: Arc<dyn MemberDirectory>,
        notifier: Arc<dyn Notifier>,
        limits: RoleLimits,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            machine,
            directory,
            notifier,
            limits,
            clock,
            notify_member: false,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Also send the expiry notice to the affected member.
    pub fn notify_member_on_expiry(mut self, enabled: bool) -> Self {
        self.notify_member = enabled;
        self
    }

    pub fn is_sweeping(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Run one sweep at the clock's current instant.
    pub fn sweep(&self) -> AppResult<SweepOutcome> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("expiration sweep already in progress, skipping");
            return Ok(SweepOutcome::AlreadyRunning);
        }
        let _guard = SweepGuard(&self.in_progress);

        let now = self.clock.now();
        let open = self.machine.store().list_open_sessions().map_err(|e| match e {
            AppError::StoreUnavailable(_) => e,
            other => AppError::StoreUnavailable(other.to_string()),
        })?;

        let mut report = SweepReport {
            examined: open.len(),
            ..SweepReport::default()
        };

        for record in &open {
            match self.process_member(record, now) {
                Ok(MemberOutcome::Expired) => report.expired.push(record.member_id.clone()),
                Ok(MemberOutcome::WithinLimit) => report.within_limit += 1,
                Ok(MemberOutcome::NoQualifyingRole) => report.skipped_no_role += 1,
                Ok(MemberOutcome::ClosedConcurrently) => report.closed_concurrently += 1,
                Err(e) => {
                    error!(member = %record.member_id, error = %e, "expiration check failed");
                    report.failures += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            expired = report.expired.len(),
            within_limit = report.within_limit,
            skipped_no_role = report.skipped_no_role,
            failures = report.failures,
            "expiration sweep completed"
        );
        Ok(SweepOutcome::Completed(report))
    }

    fn process_member(
        &self,
        record: &AttendanceRecord,
        now: DateTime<Utc>,
    ) -> AppResult<MemberOutcome> {
        let member = &record.member_id;
        let roles = self.directory.qualifying_roles(member)?;
        let Some((role, limit)) = self.limits.effective_limit(roles.iter()) else {
            debug!(member = %member, "no qualifying role, session left open");
            return Ok(MemberOutcome::NoQualifyingRole);
        };

        let expiry = match self.machine.force_expire(member, limit, now) {
            Ok(expiry) => expiry,
            Err(AppError::LimitNotExceeded { .. }) => return Ok(MemberOutcome::WithinLimit),
            Err(AppError::NoActiveSession(_)) => return Ok(MemberOutcome::ClosedConcurrently),
            Err(e) => return Err(e),
        };

        let notice = Notice::SessionExpired {
            member: member.clone(),
            role,
            limit_hours: expiry.limit_hours,
            elapsed_hours: expiry.elapsed_hours,
            closed_at: now,
        };
        let mut delivery = self.notifier.notify(&Channel::Admin, &notice, None);
        if self.notify_member {
            let direct = self
                .notifier
                .notify(&Channel::Member(member.clone()), &notice, None);
            delivery = delivery.and(direct);
        }
        if let Err(e) = delivery {
            // The expiry itself stands; only the announcement failed.
            error!(member = %member, error = %e, "failed to deliver expiry notice");
        }
        Ok(MemberOutcome::Expired)
    }

    /// Sweep forever: first after `initial_delay`, then every `interval`,
    /// until `shutdown` flips or its sender goes away.
    pub async fn run(
        self: Arc<Self>,
        initial_delay: Duration,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(?initial_delay, ?interval, "expiration monitor started");
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {}
            _ = shutdown.changed() => {
                info!("expiration monitor stopped before first sweep");
                return;
            }
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("expiration monitor shutting down");
                    break;
                }
            }

            let monitor = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || monitor.sweep()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(error = %e, "expiration sweep skipped this cycle"),
                Err(e) => error!(error = %e, "expiration sweep task panicked"),
            }
        }
    }
}
