//! Weekly rollover: wait for the next configured weekday/time, export the
//! totals, reset them, and wait again.

use crate::core::clock::Clock;
use crate::core::notify::{Channel, Notice, Notifier};
use crate::core::store::{RecordStore, RetentionPolicy};
use crate::errors::{AppError, AppResult};
use crate::export::{ExportOutcome, Exporter};
use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, NaiveTime, Utc, Weekday};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Fixed weekday + time of day in a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloverSchedule {
    weekday: Weekday,
    time: NaiveTime,
    offset: FixedOffset,
}

impl RolloverSchedule {
    pub fn new(weekday: Weekday, time: NaiveTime, utc_offset_hours: i32) -> AppResult<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            AppError::Config(format!("Invalid UTC offset: {utc_offset_hours} hours"))
        })?;
        Ok(Self {
            weekday,
            time,
            offset,
        })
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Next occurrence strictly after "today's occurrence has passed".
    ///
    /// When `now` falls on the target weekday at or after the target time,
    /// the result is one week later.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset);
        let target = i64::from(self.weekday.num_days_from_sunday());
        let today = i64::from(local.weekday().num_days_from_sunday());

        let mut days = (target - today + 7) % 7;
        if days == 0 && local.time() >= self.time {
            days = 7;
        }

        let local_target = (local.date_naive() + Days::new(days as u64)).and_time(self.time);
        let utc_naive = local_target - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::<Utc>::from_naive_utc_and_offset(utc_naive, Utc)
    }

    /// Next occurrence and the wait until it.
    pub fn delay_until_next(&self, now: DateTime<Utc>) -> (DateTime<Utc>, std::time::Duration) {
        let next = self.next_after(now);
        let delay = (next - now).to_std().unwrap_or_default();
        (next, delay)
    }
}

/// What one rollover did.
#[derive(Debug, Clone, PartialEq)]
pub enum RolloverOutcome {
    Completed {
        report: PathBuf,
        rows: usize,
        reset: usize,
        deleted: usize,
    },
    NothingToExport,
    /// Export failed; totals were left untouched.
    ExportFailed(String),
    /// Export succeeded but the reset could not be applied.
    ResetFailed { report: PathBuf, error: String },
}

pub struct RolloverScheduler {
    schedule: RolloverSchedule,
    store: Arc<dyn RecordStore>,
    exporter: Exporter,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    retention: RetentionPolicy,
    keep_exports: bool,
    next_wake: Mutex<Option<DateTime<Utc>>>,
}

impl RolloverScheduler {
    pub fn new(
        schedule: RolloverSchedule,
        store: Arc<dyn RecordStore>,
        exporter: Exporter,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schedule,
            store,
            exporter,
            notifier,
            clock,
            retention: RetentionPolicy::default(),
            keep_exports: true,
            next_wake: Mutex::new(None),
        }
    }

    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.retention = policy;
        self
    }

    pub fn keep_exports(mut self, keep: bool) -> Self {
        self.keep_exports = keep;
        self
    }

    pub fn schedule(&self) -> &RolloverSchedule {
        &self.schedule
    }

    /// Instant the scheduler is currently waiting for, if any.
    pub fn next_wake(&self) -> Option<DateTime<Utc>> {
        *self.next_wake.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_next_wake(&self, next: Option<DateTime<Utc>>) {
        *self.next_wake.lock().unwrap_or_else(|p| p.into_inner()) = next;
    }

    /// Export, then reset. Never resets without a successful export.
    pub fn fire(&self, fired_at: DateTime<Utc>) -> RolloverOutcome {
        info!(at = %fired_at, "weekly rollover starting");

        let (report, rows) = match self.exporter.export(fired_at) {
            Ok(ExportOutcome::Written { path, rows }) => (path, rows),
            Ok(ExportOutcome::NothingToExport) => {
                info!("no attendance records, rollover has nothing to export");
                return RolloverOutcome::NothingToExport;
            }
            Err(e) => {
                error!(error = %e, "weekly export failed, totals left untouched");
                let reason = match e {
                    AppError::ExportFailed(detail) => detail,
                    other => other.to_string(),
                };
                self.announce(
                    &Notice::RolloverSkipped {
                        reason: reason.clone(),
                    },
                    None,
                );
                return RolloverOutcome::ExportFailed(reason);
            }
        };

        let reset = match self.store.reset_all_accrued(fired_at) {
            Ok(0) => {
                warn!("no records were updated to reset accrued hours");
                0
            }
            Ok(n) => {
                info!(records = n, "accrued hours reset");
                n
            }
            Err(e) => {
                error!(error = %e, "reset after export failed");
                self.announce(
                    &Notice::RolloverSkipped {
                        reason: format!("reset failed after export: {e}"),
                    },
                    Some(&report),
                );
                return RolloverOutcome::ResetFailed {
                    report,
                    error: e.to_string(),
                };
            }
        };

        let cycle_start = fired_at - Duration::weeks(1);
        let deleted = match self.store.delete_incomplete(self.retention, cycle_start) {
            Ok(n) => {
                info!(records = n, policy = self.retention.as_str(), "retention cleanup done");
                n
            }
            Err(e) => {
                error!(error = %e, "retention cleanup failed");
                0
            }
        };

        self.announce(
            &Notice::RolloverCompleted {
                report: report.clone(),
                rows,
                reset,
                deleted,
            },
            Some(&report),
        );

        if !self.keep_exports {
            match fs::remove_file(&report) {
                Ok(()) => info!(path = %report.display(), "export removed after delivery"),
                Err(e) => warn!(path = %report.display(), error = %e, "failed to remove export"),
            }
        }

        RolloverOutcome::Completed {
            report,
            rows,
            reset,
            deleted,
        }
    }

    fn announce(&self, notice: &Notice, attachment: Option<&PathBuf>) {
        if let Err(e) = self
            .notifier
            .notify(&Channel::Admin, notice, attachment.map(PathBuf::as_path))
        {
            error!(error = %e, "failed to deliver rollover notice");
        }
    }

    /// Wait for each occurrence and fire it, until `shutdown` flips or its
    /// sender goes away.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("weekly rollover scheduler initialized");
        loop {
            let now = self.clock.now();
            // A wall clock lagging the timer must not yield the occurrence just fired.
            let from = self.next_wake().map_or(now, |prev| now.max(prev));
            let next = self.schedule.next_after(from);
            let delay = (next - now).to_std().unwrap_or_default();
            self.set_next_wake(Some(next));
            info!(
                next = %next.with_timezone(&self.schedule.offset()),
                hours = delay.as_secs() / 3600,
                "next rollover scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    info!("rollover scheduler shutting down");
                    break;
                }
            }

            let scheduler = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || scheduler.fire(next)).await {
                Ok(outcome) => info!(?outcome, "weekly rollover finished"),
                Err(e) => error!(error = %e, "weekly rollover task panicked"),
            }
        }
        self.set_next_wake(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wednesday_six() -> RolloverSchedule {
        RolloverSchedule::new(
            Weekday::Wed,
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            8,
        )
        .unwrap()
    }

    fn at_plus8(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn before_target_time_on_target_day_fires_same_day() {
        // 2025-06-04 is a Wednesday
        let now = at_plus8(2025, 6, 4, 5, 0);
        let (next, delay) = wednesday_six().delay_until_next(now);
        assert_eq!(next, at_plus8(2025, 6, 4, 6, 0));
        assert_eq!(delay, std::time::Duration::from_secs(3600));
    }

    #[test]
    fn after_target_time_on_target_day_fires_next_week() {
        let now = at_plus8(2025, 6, 4, 7, 0);
        assert_eq!(wednesday_six().next_after(now), at_plus8(2025, 6, 11, 6, 0));
    }

    #[test]
    fn exactly_at_target_time_moves_to_next_week() {
        let now = at_plus8(2025, 6, 4, 6, 0);
        assert_eq!(wednesday_six().next_after(now), at_plus8(2025, 6, 11, 6, 0));
    }

    #[test]
    fn thursday_waits_for_following_wednesday() {
        let now = at_plus8(2025, 6, 5, 12, 30);
        assert_eq!(wednesday_six().next_after(now), at_plus8(2025, 6, 11, 6, 0));
    }

    #[test]
    fn weekday_is_judged_in_target_offset() {
        // Tuesday 23:00 UTC is already Wednesday 07:00 in UTC+8.
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 23, 0, 0).unwrap();
        assert_eq!(wednesday_six().next_after(now), at_plus8(2025, 6, 11, 6, 0));
        // Tuesday 21:00 UTC is Wednesday 05:00 in UTC+8.
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 21, 0, 0).unwrap();
        assert_eq!(
            wednesday_six().next_after(now),
            Utc.with_ymd_and_hms(2025, 6, 3, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn invalid_offset_is_rejected() {
        assert!(RolloverSchedule::new(Weekday::Wed, NaiveTime::MIN, 30).is_err());
    }
}
