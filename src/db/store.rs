//! SQLite-backed [`RecordStore`].
//!
//! A single connection sits behind a mutex; every conditional upsert runs
//! inside an IMMEDIATE transaction so the state check and the write cannot
//! interleave with another process holding the same database file.

use crate::core::store::{Mutation, RecordStore, RetentionPolicy};
use crate::db::{channels, initialize, log, queries};
use crate::errors::{AppError, AppResult};
use crate::models::channels::ChannelConfig;
use crate::models::record::{AttendanceRecord, ExpectedState, MemberId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Connection-level failures become `StoreUnavailable`; everything else
/// keeps its database error.
pub fn store_error(err: rusqlite::Error) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::NotADatabase
            ) =>
        {
            AppError::StoreUnavailable(err.to_string())
        }
        _ => AppError::Db(err),
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path).map_err(store_error)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(store_error)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::from_connection(Connection::open_in_memory().map_err(store_error)?)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        initialize::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::StoreUnavailable("database connection lock poisoned".into()))
    }

    /// Helper to execute a closure with the locked connection.
    pub fn with_conn<F, T>(&self, func: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        let conn = self.lock()?;
        func(&conn)
    }

    /// Append a row to the audit `log` table.
    pub fn audit(&self, operation: &str, target: &str, message: &str) -> AppResult<()> {
        self.with_conn(|conn| log::ttlog(conn, operation, target, message))
    }

    pub fn channels_initialized(&self) -> AppResult<bool> {
        self.with_conn(channels::is_initialized)
    }

    pub fn initialize_channels(&self, cfg: &ChannelConfig) -> AppResult<()> {
        self.with_conn(|conn| channels::initialize(conn, cfg))
    }

    pub fn load_channels(&self) -> AppResult<ChannelConfig> {
        self.with_conn(channels::load)
    }

    pub fn clear_channels(&self) -> AppResult<bool> {
        self.with_conn(channels::clear)
    }

    pub fn counts(&self) -> AppResult<queries::AttendanceCounts> {
        self.with_conn(|conn| queries::count_attendance(conn).map_err(store_error))
    }
}

impl RecordStore for SqliteStore {
    fn find(&self, member: &MemberId) -> AppResult<Option<AttendanceRecord>> {
        self.with_conn(|conn| queries::find_record(conn, member).map_err(store_error))
    }

    fn upsert_conditional(
        &self,
        member: &MemberId,
        expected: ExpectedState,
        mutation: &mut Mutation<'_>,
    ) -> AppResult<AttendanceRecord> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error)?;

        let current = queries::find_record(&tx, member).map_err(store_error)?;
        if !expected.matches(current.as_ref()) {
            return Err(AppError::Conflict {
                member: member.clone(),
                expected: expected.to_string(),
            });
        }

        let updated = mutation(current.as_ref())?;
        if &updated.member_id != member {
            return Err(AppError::Other(format!(
                "mutation for {member} produced a record for {}",
                updated.member_id
            )));
        }

        queries::upsert_record(&tx, &updated).map_err(store_error)?;
        tx.commit().map_err(store_error)?;
        Ok(updated)
    }

    fn list_open_sessions(&self) -> AppResult<Vec<AttendanceRecord>> {
        self.with_conn(|conn| queries::load_open_sessions(conn).map_err(store_error))
    }

    fn list_all(&self) -> AppResult<Vec<AttendanceRecord>> {
        self.with_conn(|conn| queries::load_all(conn).map_err(store_error))
    }

    fn reset_all_accrued(&self, now: DateTime<Utc>) -> AppResult<usize> {
        self.with_conn(|conn| queries::reset_accrued(conn, &now).map_err(store_error))
    }

    fn delete_incomplete(
        &self,
        policy: RetentionPolicy,
        cycle_start: DateTime<Utc>,
    ) -> AppResult<usize> {
        if policy == RetentionPolicy::KeepAll {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error)?;

        let mut deleted = 0;
        for record in queries::load_all(&tx).map_err(store_error)? {
            if policy.should_delete(&record, cycle_start) {
                deleted += queries::delete_record(&tx, &record.member_id).map_err(store_error)?;
            }
        }

        tx.commit().map_err(store_error)?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state_machine::AttendanceStateMachine;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::Arc;

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 4, 0, 0, 0).unwrap() + ChronoDuration::hours(h)
    }

    fn channel_cfg() -> ChannelConfig {
        ChannelConfig {
            category_id: "10".into(),
            clock_in_channel_id: "11".into(),
            clock_in_interface_id: "12".into(),
            clock_out_channel_id: "13".into(),
            clock_out_interface_id: "14".into(),
            admin_channel_id: "15".into(),
            clock_in_role_id: "16".into(),
        }
    }

    #[test]
    fn record_survives_round_trip_through_sqlite() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let machine = AttendanceStateMachine::new(store.clone());
        let id = MemberId::from("u1");

        machine.clock_in(&id, t(0)).unwrap();
        let open = store.find(&id).unwrap().unwrap();
        assert_eq!(open.session_start, Some(t(0)));
        assert_eq!(store.list_open_sessions().unwrap().len(), 1);

        let out = machine
            .clock_out(&id, t(0) + ChronoDuration::minutes(90))
            .unwrap();
        assert_eq!(out.delta_hours, 1.5);

        let closed = store.find(&id).unwrap().unwrap();
        assert_eq!(closed.accrued_hours, 1.5);
        assert!(closed.session_start.is_none());
        assert_eq!(closed.session_end, Some(t(0) + ChronoDuration::minutes(90)));
        assert!(store.list_open_sessions().unwrap().is_empty());
    }

    #[test]
    fn conditional_upsert_conflict_does_not_write() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = MemberId::from("u1");
        let err = store
            .upsert_conditional(&id, ExpectedState::Open, &mut |_| {
                Ok(AttendanceRecord::new(MemberId::from("u1"), t(0)))
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn reset_zeroes_every_total() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let machine = AttendanceStateMachine::new(store.clone());
        for id in ["a", "b"] {
            let id = MemberId::from(id);
            machine.clock_in(&id, t(0)).unwrap();
            machine.clock_out(&id, t(2)).unwrap();
        }
        assert_eq!(store.reset_all_accrued(t(5)).unwrap(), 2);
        assert_eq!(store.reset_all_accrued(t(6)).unwrap(), 0);
        for rec in store.list_all().unwrap() {
            assert_eq!(rec.accrued_hours, 0.0);
            assert_eq!(rec.updated_at, t(5));
        }
    }

    #[test]
    fn retention_policies_select_different_records() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let machine = AttendanceStateMachine::new(store.clone());

        let stale = MemberId::from("stale");
        machine.clock_in(&stale, t(-30)).unwrap();
        machine.clock_out(&stale, t(-29)).unwrap();

        let stuck = MemberId::from("stuck");
        machine.clock_in(&stuck, t(-20)).unwrap();

        let fresh = MemberId::from("fresh");
        machine.clock_in(&fresh, t(1)).unwrap();
        machine.clock_out(&fresh, t(2)).unwrap();

        assert_eq!(
            store
                .delete_incomplete(RetentionPolicy::KeepAll, t(0))
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .delete_incomplete(RetentionPolicy::OpenWithoutClose, t(0))
                .unwrap(),
            1
        );
        assert!(store.find(&stuck).unwrap().is_none());

        assert_eq!(
            store
                .delete_incomplete(RetentionPolicy::ClosedWithoutOpen, t(0))
                .unwrap(),
            1
        );
        assert!(store.find(&stale).unwrap().is_none());
        assert!(store.find(&fresh).unwrap().is_some());
    }

    #[test]
    fn racing_clock_ins_on_one_member_let_exactly_one_win() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("race.sqlite");
        let stores = [
            Arc::new(SqliteStore::open(&path).unwrap()),
            Arc::new(SqliteStore::open(&path).unwrap()),
        ];
        let barrier = std::sync::Barrier::new(stores.len());
        let id = MemberId::from("u1");

        let results: Vec<AppResult<AttendanceRecord>> = std::thread::scope(|scope| {
            let handles: Vec<_> = stores
                .iter()
                .enumerate()
                .map(|(i, store)| {
                    let machine = AttendanceStateMachine::new(store.clone());
                    let (barrier, id) = (&barrier, &id);
                    scope.spawn(move || {
                        barrier.wait();
                        machine.clock_in(id, t(i as i64))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(AppError::AlreadyActive(m)) if m == &id))
        );

        let stored = stores[0].find(&id).unwrap().unwrap();
        assert_eq!(stored.session_start, winners[0].session_start);
    }

    #[test]
    fn channels_initialize_only_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.channels_initialized().unwrap());
        assert!(matches!(
            store.load_channels().unwrap_err(),
            AppError::NotInitialized
        ));

        store.initialize_channels(&channel_cfg()).unwrap();
        assert!(store.channels_initialized().unwrap());
        assert!(matches!(
            store.initialize_channels(&channel_cfg()).unwrap_err(),
            AppError::AlreadyInitialized
        ));
        assert_eq!(store.load_channels().unwrap(), channel_cfg());

        assert!(store.clear_channels().unwrap());
        assert!(!store.clear_channels().unwrap());
        store.initialize_channels(&channel_cfg()).unwrap();
    }

    #[test]
    fn audit_rows_are_appended() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.audit("clock_in", "u1", "Clocked in").unwrap();
        let rows = store.with_conn(log::load_log).unwrap();
        let last = rows.last().unwrap();
        assert_eq!(last.2, "clock_in");
        assert_eq!(last.3, "u1");
    }
}
