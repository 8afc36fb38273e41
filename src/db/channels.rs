//! Singleton `clock_channels` row.

use crate::errors::{AppError, AppResult};
use crate::models::channels::ChannelConfig;
use rusqlite::{Connection, OptionalExtension, params};

pub fn is_initialized(conn: &Connection) -> AppResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM clock_channels WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

/// Store the channel configuration. Fails with `AlreadyInitialized` if a
/// row already exists.
pub fn initialize(conn: &Connection, cfg: &ChannelConfig) -> AppResult<()> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO clock_channels
            (id, category_id, clock_in_channel_id, clock_in_interface_id,
             clock_out_channel_id, clock_out_interface_id, admin_channel_id, clock_in_role_id)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            cfg.category_id,
            cfg.clock_in_channel_id,
            cfg.clock_in_interface_id,
            cfg.clock_out_channel_id,
            cfg.clock_out_interface_id,
            cfg.admin_channel_id,
            cfg.clock_in_role_id,
        ],
    )?;

    if inserted == 0 {
        return Err(AppError::AlreadyInitialized);
    }
    Ok(())
}

pub fn load(conn: &Connection) -> AppResult<ChannelConfig> {
    conn.query_row(
        "SELECT category_id, clock_in_channel_id, clock_in_interface_id,
                clock_out_channel_id, clock_out_interface_id, admin_channel_id, clock_in_role_id
         FROM clock_channels WHERE id = 1",
        [],
        |row| {
            Ok(ChannelConfig {
                category_id: row.get(0)?,
                clock_in_channel_id: row.get(1)?,
                clock_in_interface_id: row.get(2)?,
                clock_out_channel_id: row.get(3)?,
                clock_out_interface_id: row.get(4)?,
                admin_channel_id: row.get(5)?,
                clock_in_role_id: row.get(6)?,
            })
        },
    )
    .optional()?
    .ok_or(AppError::NotInitialized)
}

/// Remove the row. Returns whether something was deleted.
pub fn clear(conn: &Connection) -> AppResult<bool> {
    Ok(conn.execute("DELETE FROM clock_channels WHERE id = 1", [])? > 0)
}
