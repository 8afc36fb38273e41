use crate::errors::AppError;
use crate::models::record::{AttendanceRecord, MemberId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use rusqlite::{Connection, OptionalExtension, Result, Row};

const RECORD_COLUMNS: &str =
    "member_id, session_start, session_end, accrued_hours, created_at, updated_at";

/// Instants are stored as RFC3339 text with millisecond precision, UTC.
pub fn to_db_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_instant(idx: usize, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(AppError::InvalidStoredValue(format!(
                    "Invalid instant: {}",
                    raw
                ))),
            )
        })
}

fn opt_instant(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => parse_instant(idx, &raw).map(Some),
        None => Ok(None),
    }
}

pub fn map_row(row: &Row) -> Result<AttendanceRecord> {
    let created_raw: String = row.get(4)?;
    let updated_raw: String = row.get(5)?;

    Ok(AttendanceRecord {
        member_id: MemberId(row.get(0)?),
        session_start: opt_instant(row, 1)?,
        session_end: opt_instant(row, 2)?,
        accrued_hours: row.get(3)?,
        created_at: parse_instant(4, &created_raw)?,
        updated_at: parse_instant(5, &updated_raw)?,
    })
}

pub fn find_record(conn: &Connection, member: &MemberId) -> Result<Option<AttendanceRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE member_id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.query_row([member.as_str()], map_row).optional()
}

/// Insert or replace the row for `record.member_id`.
pub fn upsert_record(conn: &Connection, record: &AttendanceRecord) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO attendance
            (member_id, session_start, session_end, accrued_hours, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(member_id) DO UPDATE SET
            session_start = excluded.session_start,
            session_end   = excluded.session_end,
            accrued_hours = excluded.accrued_hours,
            updated_at    = excluded.updated_at",
    )?;

    stmt.execute(params![
        record.member_id.as_str(),
        record.session_start.as_ref().map(to_db_instant),
        record.session_end.as_ref().map(to_db_instant),
        record.accrued_hours,
        to_db_instant(&record.created_at),
        to_db_instant(&record.updated_at),
    ])?;

    Ok(())
}

fn load_where(conn: &Connection, filter: &str) -> Result<Vec<AttendanceRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance {filter} ORDER BY member_id ASC");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn load_open_sessions(conn: &Connection) -> Result<Vec<AttendanceRecord>> {
    load_where(conn, "WHERE session_start IS NOT NULL")
}

pub fn load_all(conn: &Connection) -> Result<Vec<AttendanceRecord>> {
    load_where(conn, "")
}

pub fn reset_accrued(conn: &Connection, now: &DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "UPDATE attendance SET accrued_hours = 0, updated_at = ?1 WHERE accrued_hours <> 0",
        [to_db_instant(now)],
    )
}

pub fn delete_record(conn: &Connection, member: &MemberId) -> Result<usize> {
    conn.execute(
        "DELETE FROM attendance WHERE member_id = ?1",
        [member.as_str()],
    )
}

/// Counters shown by `db --info` and `status`.
pub struct AttendanceCounts {
    pub members: i64,
    pub open_sessions: i64,
    pub accrued_total: f64,
}

pub fn count_attendance(conn: &Connection) -> Result<AttendanceCounts> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN session_start IS NOT NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(accrued_hours), 0.0)
         FROM attendance",
        [],
        |row| {
            Ok(AttendanceCounts {
                members: row.get(0)?,
                open_sessions: row.get(1)?,
                accrued_total: row.get(2)?,
            })
        },
    )
}
