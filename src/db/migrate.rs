use crate::ui::messages::success;
use rusqlite::{Connection, OptionalExtension, Result};

/// Ensure that the `log` table exists.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Check if a table exists.
fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
    let exists: Option<String> = stmt.query_row([name], |row| row.get(0)).optional()?;
    Ok(exists.is_some())
}

/// Create the `attendance` table: one row per member.
fn create_attendance_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            member_id     TEXT PRIMARY KEY,
            session_start TEXT,
            session_end   TEXT,
            accrued_hours REAL NOT NULL DEFAULT 0 CHECK(accrued_hours >= 0),
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL,
            CHECK(session_start IS NULL OR session_end IS NULL)
        );
        "#,
    )?;
    Ok(())
}

/// Create the singleton `clock_channels` table.
fn create_clock_channels_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS clock_channels (
            id                     INTEGER PRIMARY KEY CHECK(id = 1),
            category_id            TEXT NOT NULL,
            clock_in_channel_id    TEXT NOT NULL,
            clock_in_interface_id  TEXT NOT NULL,
            clock_out_channel_id   TEXT NOT NULL,
            clock_out_interface_id TEXT NOT NULL,
            admin_channel_id       TEXT NOT NULL,
            clock_in_role_id       TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn migration_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn migrate_add_open_session_index(conn: &Connection) -> Result<()> {
    let version = "20250610_0002_attendance_open_index";

    if migration_applied(conn, version)? {
        return Ok(());
    }

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_attendance_open
         ON attendance(session_start) WHERE session_start IS NOT NULL;",
    )?;

    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, 'Added open-session index to attendance')",
        [version],
    )?;

    success(format!(
        "Migration applied: {} → added open-session index",
        version
    ));

    Ok(())
}

/// Public entry point: run all pending migrations.
///
/// Invoked by db::init_db().
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    ensure_log_table(conn)?;

    if !table_exists(conn, "attendance")? {
        create_attendance_table(conn)?;
        success("Created attendance table.");
    }

    if !table_exists(conn, "clock_channels")? {
        create_clock_channels_table(conn)?;
    }

    migrate_add_open_session_index(conn)?;

    Ok(())
}
