use crate::cli::commands::open_store;
use crate::config::Config;
use crate::core::clock::Clock;
use crate::core::roles::MemberDirectory;
use crate::core::store::RecordStore;
use crate::errors::AppResult;
use crate::utils::colors::{RESET, color_for_elapsed, color_for_state};
use crate::utils::table::{Column, Table};
use std::sync::Arc;

/// Print every record with its state and, for open sessions, the elapsed
/// time against the member's effective limit.
pub fn handle(cfg: &Config, clock: Arc<dyn Clock>) -> AppResult<()> {
    let store = open_store(cfg)?;
    let records = store.list_all()?;
    if records.is_empty() {
        println!("No attendance records.");
        return Ok(());
    }

    let directory = cfg.directory();
    let limits = cfg.role_limits()?;
    let now = clock.now();

    let mut table = Table::new(vec![
        Column::new("MEMBER", 20),
        Column::new("NAME", 20),
        Column::new("STATE", 8),
        Column::new("ELAPSED", 9),
        Column::new("LIMIT", 7),
        Column::new("ACCRUED", 8),
    ]);

    for rec in &records {
        let name = directory
            .display_name(&rec.member_id)?
            .unwrap_or_else(|| "Unknown".to_string());
        let roles = directory.qualifying_roles(&rec.member_id)?;
        let limit = limits.effective_limit(roles.iter()).map(|(_, h)| h);
        let state = rec.state().as_str();

        let elapsed = match rec.elapsed_hours(now) {
            Some(h) => format!("{}{:.2}{}", color_for_elapsed(h, limit), h, RESET),
            None => "--".to_string(),
        };

        table.add_row(vec![
            rec.member_id.to_string(),
            name,
            format!("{}{}{}", color_for_state(state), state, RESET),
            elapsed,
            limit.map_or_else(|| "--".to_string(), |h| format!("{h:.2}")),
            format!("{:.2}", rec.accrued_hours),
        ]);
    }

    print!("{}", table.render());
    Ok(())
}
