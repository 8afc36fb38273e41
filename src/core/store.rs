//! Persistence abstraction for attendance records.
//!
//! Every session mutation goes through [`RecordStore::upsert_conditional`],
//! which checks the expected open state and applies the mutation as one
//! atomic step per member. Two racing transitions on the same member
//! therefore resolve as "first one wins" and the loser sees a
//! [`AppError::Conflict`].

use crate::errors::{AppError, AppResult};
use crate::models::record::{AttendanceRecord, ExpectedState, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Mutation applied to the current record (if any) once the expected state
/// has been confirmed. Returning an error aborts the write.
pub type Mutation<'a> = dyn FnMut(Option<&AttendanceRecord>) -> AppResult<AttendanceRecord> + 'a;

pub trait RecordStore: Send + Sync {
    fn find(&self, member: &MemberId) -> AppResult<Option<AttendanceRecord>>;

    fn upsert_conditional(
        &self,
        member: &MemberId,
        expected: ExpectedState,
        mutation: &mut Mutation<'_>,
    ) -> AppResult<AttendanceRecord>;

    fn list_open_sessions(&self) -> AppResult<Vec<AttendanceRecord>>;

    fn list_all(&self) -> AppResult<Vec<AttendanceRecord>>;

    /// Zero `accrued_hours` everywhere, stamping `updated_at` with `now`.
    /// Returns how many records changed.
    fn reset_all_accrued(&self, now: DateTime<Utc>) -> AppResult<usize>;

    /// Delete the records selected by `policy` for the cycle that started at
    /// `cycle_start`. Returns how many records were removed.
    fn delete_incomplete(
        &self,
        policy: RetentionPolicy,
        cycle_start: DateTime<Utc>,
    ) -> AppResult<usize>;
}

/// Which records the weekly cleanup removes after the accrued reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Never delete records.
    KeepAll,
    /// Idle records whose last close happened before the cycle started,
    /// i.e. no session was completed during the elapsed cycle.
    #[default]
    ClosedWithoutOpen,
    /// Records still clocked in since before the cycle started.
    OpenWithoutClose,
}

impl RetentionPolicy {
    pub fn should_delete(&self, record: &AttendanceRecord, cycle_start: DateTime<Utc>) -> bool {
        match self {
            RetentionPolicy::KeepAll => false,
            RetentionPolicy::ClosedWithoutOpen => {
                record.session_start.is_none()
                    && record.session_end.is_some_and(|end| end < cycle_start)
            }
            RetentionPolicy::OpenWithoutClose => {
                record.session_end.is_none()
                    && record.session_start.is_some_and(|start| start < cycle_start)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionPolicy::KeepAll => "keep_all",
            RetentionPolicy::ClosedWithoutOpen => "closed_without_open",
            RetentionPolicy::OpenWithoutClose => "open_without_close",
        }
    }
}

/// In-process store backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<MemberId, AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, BTreeMap<MemberId, AttendanceRecord>>> {
        self.records
            .lock()
            .map_err(|_| AppError::StoreUnavailable("memory store lock poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn find(&self, member: &MemberId) -> AppResult<Option<AttendanceRecord>> {
        Ok(self.lock()?.get(member).cloned())
    }

    fn upsert_conditional(
        &self,
        member: &MemberId,
        expected: ExpectedState,
        mutation: &mut Mutation<'_>,
    ) -> AppResult<AttendanceRecord> {
        let mut records = self.lock()?;
        let current = records.get(member);
        if !expected.matches(current) {
            return Err(AppError::Conflict {
                member: member.clone(),
                expected: expected.to_string(),
            });
        }
        let updated = mutation(current)?;
        if &updated.member_id != member {
            return Err(AppError::Other(format!(
                "mutation for {member} produced a record for {}",
                updated.member_id
            )));
        }
        records.insert(member.clone(), updated.clone());
        Ok(updated)
    }

    fn list_open_sessions(&self) -> AppResult<Vec<AttendanceRecord>> {
        Ok(self
            .lock()?
            .values()
            .filter(|r| r.is_open())
            .cloned()
            .collect())
    }

    fn list_all(&self) -> AppResult<Vec<AttendanceRecord>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn reset_all_accrued(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let mut changed = 0;
        for rec in self.lock()?.values_mut() {
            if rec.accrued_hours != 0.0 {
                rec.accrued_hours = 0.0;
                rec.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn delete_incomplete(
        &self,
        policy: RetentionPolicy,
        cycle_start: DateTime<Utc>,
    ) -> AppResult<usize> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|_, rec| !policy.should_delete(rec, cycle_start));
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 4, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn open(id: &str, start: DateTime<Utc>) -> AttendanceRecord {
        let mut r = AttendanceRecord::new(MemberId::from(id), start);
        r.session_start = Some(start);
        r
    }

    fn closed(id: &str, end: DateTime<Utc>, hours: f64) -> AttendanceRecord {
        let mut r = AttendanceRecord::new(MemberId::from(id), end);
        r.session_end = Some(end);
        r.accrued_hours = hours;
        r
    }

    fn seed(store: &MemoryStore, rec: AttendanceRecord) {
        let id = rec.member_id.clone();
        store
            .upsert_conditional(&id, ExpectedState::NotOpen, &mut |_| Ok(rec.clone()))
            .unwrap();
    }

    #[test]
    fn conditional_upsert_rejects_unexpected_state() {
        let store = MemoryStore::new();
        let id = MemberId::from("u1");
        let err = store
            .upsert_conditional(&id, ExpectedState::Open, &mut |_| {
                Ok(AttendanceRecord::new(MemberId::from("u1"), t(0)))
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        assert!(store.find(&id).unwrap().is_none());
    }

    #[test]
    fn failing_mutation_leaves_record_untouched() {
        let store = MemoryStore::new();
        seed(&store, closed("u1", t(1), 3.0));
        let id = MemberId::from("u1");
        let err = store
            .upsert_conditional(&id, ExpectedState::NotOpen, &mut |_| {
                Err(AppError::Other("nope".into()))
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Other(_)));
        assert_eq!(store.find(&id).unwrap().unwrap().accrued_hours, 3.0);
    }

    #[test]
    fn reset_counts_only_changed_records() {
        let store = MemoryStore::new();
        seed(&store, closed("a", t(1), 3.0));
        seed(&store, closed("b", t(1), 0.0));
        assert_eq!(store.reset_all_accrued(t(9)).unwrap(), 1);
        assert!(store.list_all().unwrap().iter().all(|r| r.accrued_hours == 0.0));
        assert_eq!(store.find(&MemberId::from("a")).unwrap().unwrap().updated_at, t(9));
        assert_eq!(store.find(&MemberId::from("b")).unwrap().unwrap().updated_at, t(1));
    }

    #[test]
    fn closed_without_open_deletes_idle_records_from_before_the_cycle() {
        let store = MemoryStore::new();
        seed(&store, closed("stale", t(-10), 0.0));
        seed(&store, closed("recent", t(5), 2.0));
        seed(&store, open("working", t(-20)));

        let removed = store
            .delete_incomplete(RetentionPolicy::ClosedWithoutOpen, t(0))
            .unwrap();
        assert_eq!(removed, 1);
        let ids: Vec<_> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.member_id.0)
            .collect();
        assert_eq!(ids, vec!["recent".to_string(), "working".to_string()]);
    }

    #[test]
    fn open_without_close_deletes_sessions_started_before_the_cycle() {
        let store = MemoryStore::new();
        seed(&store, closed("stale", t(-10), 0.0));
        seed(&store, open("old_open", t(-20)));
        seed(&store, open("new_open", t(2)));

        let removed = store
            .delete_incomplete(RetentionPolicy::OpenWithoutClose, t(0))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.find(&MemberId::from("old_open")).unwrap().is_none());
        assert!(store.find(&MemberId::from("stale")).unwrap().is_some());
        assert!(store.find(&MemberId::from("new_open")).unwrap().is_some());
    }

    #[test]
    fn keep_all_never_deletes() {
        let store = MemoryStore::new();
        seed(&store, closed("stale", t(-10), 0.0));
        assert_eq!(
            store.delete_incomplete(RetentionPolicy::KeepAll, t(0)).unwrap(),
            0
        );
    }
}
