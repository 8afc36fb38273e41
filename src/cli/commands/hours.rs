use crate::cli::commands::open_store;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::state_machine::AttendanceStateMachine;
use crate::errors::AppResult;
use crate::export::round_hours;
use crate::models::record::MemberId;
use crate::ui::messages::{info, warning};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Hours { member } = cmd {
        let member = MemberId::new(member.as_str());
        let machine = AttendanceStateMachine::new(open_store(cfg)?);

        match machine.current_total(&member)? {
            Some(hours) => info(format!(
                "{member}: {:.2}h this cycle ({}h rounded), state {}",
                hours,
                round_hours(hours),
                machine.state_of(&member)?.as_str()
            )),
            None => warning(format!("{member} has no attendance record yet.")),
        }
    }
    Ok(())
}
