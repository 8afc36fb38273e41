use crate::db::store::SqliteStore;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::OptionalExtension;
use std::fs;
use std::path::Path;

pub fn print_db_info(store: &SqliteStore, db_path: &Path) -> AppResult<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!(
        "{}• File:{} {}{}{}",
        CYAN,
        RESET,
        YELLOW,
        db_path.display(),
        RESET
    );
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) MEMBERS / OPEN SESSIONS
    //
    let counts = store.counts()?;
    println!(
        "{}• Members:{} {}{}{}",
        CYAN, RESET, GREEN, counts.members, RESET
    );
    println!(
        "{}• Open sessions:{} {}{}{}",
        CYAN, RESET, GREEN, counts.open_sessions, RESET
    );
    println!(
        "{}• Accrued this cycle:{} {:.2} h",
        CYAN, RESET, counts.accrued_total
    );

    //
    // 3) LAST ACTIVITY
    //
    let last: Option<String> = store.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT updated_at FROM attendance ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?)
    })?;
    let fmt_last = last.unwrap_or_else(|| format!("{GREY}--{RESET}"));
    println!("{}• Last activity:{} {}", CYAN, RESET, fmt_last);

    //
    // 4) CHANNELS
    //
    let channels = if store.channels_initialized()? {
        format!("{GREEN}initialized{RESET}")
    } else {
        format!("{GREY}not initialized{RESET}")
    };
    println!("{}• Clock channels:{} {}", CYAN, RESET, channels);

    println!();
    Ok(())
}
