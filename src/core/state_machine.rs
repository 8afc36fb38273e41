//! Session lifecycle: clock-in, clock-out and forced expiry.
//!
//! The `apply_*` functions are the pure transitions on a single record.
//! [`AttendanceStateMachine`] runs them through the store's conditional
//! upsert so the state check and the write happen as one step.

use crate::core::store::RecordStore;
use crate::errors::{AppError, AppResult};
use crate::models::record::{AttendanceRecord, ExpectedState, MemberId, SessionState};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a successful clock-out.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockOutOutcome {
    pub record: AttendanceRecord,
    pub delta_hours: f64,
}

/// Result of a successful forced expiry. The elapsed time was discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryOutcome {
    pub record: AttendanceRecord,
    pub elapsed_hours: f64,
    pub limit_hours: f64,
}

pub fn apply_clock_in(
    current: Option<&AttendanceRecord>,
    member: &MemberId,
    now: DateTime<Utc>,
) -> AppResult<AttendanceRecord> {
    let mut record = match current {
        Some(r) if r.is_open() => return Err(AppError::AlreadyActive(member.clone())),
        Some(r) => r.clone(),
        None => AttendanceRecord::new(member.clone(), now),
    };
    record.session_start = Some(now);
    record.session_end = None;
    record.updated_at = now;
    Ok(record)
}

pub fn apply_clock_out(
    current: Option<&AttendanceRecord>,
    member: &MemberId,
    now: DateTime<Utc>,
) -> AppResult<(AttendanceRecord, f64)> {
    let record = current.ok_or_else(|| AppError::NoActiveSession(member.clone()))?;
    // A clock running backwards must never shrink the total.
    let delta = record
        .elapsed_hours(now)
        .ok_or_else(|| AppError::NoActiveSession(member.clone()))?
        .max(0.0);

    let mut record = record.clone();
    record.accrued_hours += delta;
    record.session_start = None;
    record.session_end = Some(now);
    record.updated_at = now;
    Ok((record, delta))
}

pub fn apply_force_expire(
    current: Option<&AttendanceRecord>,
    member: &MemberId,
    limit_hours: f64,
    now: DateTime<Utc>,
) -> AppResult<(AttendanceRecord, f64)> {
    let record = current.ok_or_else(|| AppError::NoActiveSession(member.clone()))?;
    let elapsed = record
        .elapsed_hours(now)
        .ok_or_else(|| AppError::NoActiveSession(member.clone()))?;

    if elapsed <= limit_hours {
        return Err(AppError::LimitNotExceeded {
            member: member.clone(),
            elapsed,
            limit: limit_hours,
        });
    }

    let mut record = record.clone();
    record.session_start = None;
    record.session_end = Some(now);
    record.updated_at = now;
    Ok((record, elapsed))
}

/// Store-backed state machine. Cheap to clone.
#[derive(Clone)]
pub struct AttendanceStateMachine {
    store: Arc<dyn RecordStore>,
}

impl AttendanceStateMachine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn clock_in(&self, member: &MemberId, now: DateTime<Utc>) -> AppResult<AttendanceRecord> {
        let record = self
            .store
            .upsert_conditional(member, ExpectedState::NotOpen, &mut |current| {
                apply_clock_in(current, member, now)
            })
            .map_err(|e| match e {
                AppError::Conflict { .. } => AppError::AlreadyActive(member.clone()),
                other => other,
            })?;
        info!(member = %member, at = %now, "clock-in");
        Ok(record)
    }

    pub fn clock_out(&self, member: &MemberId, now: DateTime<Utc>) -> AppResult<ClockOutOutcome> {
        let mut delta_hours = 0.0;
        let record = self
            .store
            .upsert_conditional(member, ExpectedState::Open, &mut |current| {
                let (record, delta) = apply_clock_out(current, member, now)?;
                delta_hours = delta;
                Ok(record)
            })
            .map_err(|e| no_session_on_conflict(e, member))?;
        info!(member = %member, delta_hours, total = record.accrued_hours, "clock-out");
        Ok(ClockOutOutcome {
            record,
            delta_hours,
        })
    }

    pub fn force_expire(
        &self,
        member: &MemberId,
        limit_hours: f64,
        now: DateTime<Utc>,
    ) -> AppResult<ExpiryOutcome> {
        let mut elapsed_hours = 0.0;
        let record = self
            .store
            .upsert_conditional(member, ExpectedState::Open, &mut |current| {
                let (record, elapsed) = apply_force_expire(current, member, limit_hours, now)?;
                elapsed_hours = elapsed;
                Ok(record)
            })
            .map_err(|e| no_session_on_conflict(e, member))?;
        info!(member = %member, elapsed_hours, limit_hours, "session force-expired");
        Ok(ExpiryOutcome {
            record,
            elapsed_hours,
            limit_hours,
        })
    }

    pub fn state_of(&self, member: &MemberId) -> AppResult<SessionState> {
        Ok(self
            .store
            .find(member)?
            .map_or(SessionState::Unknown, |r| r.state()))
    }

    /// Accrued hours of the current cycle; `None` when the member has no record.
    pub fn current_total(&self, member: &MemberId) -> AppResult<Option<f64>> {
        let total = self.store.find(member)?.map(|r| r.accrued_hours);
        debug!(member = %member, ?total, "current total lookup");
        Ok(total)
    }
}

fn no_session_on_conflict(e: AppError, member: &MemberId) -> AppError {
    match e {
        AppError::Conflict { .. } => AppError::NoActiveSession(member.clone()),
        other => other,
    }
}
