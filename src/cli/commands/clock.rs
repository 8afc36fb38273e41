use crate::cli::commands::open_store;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::clock::Clock;
use crate::core::notify::{Channel, LogNotifier, Notice, Notifier};
use crate::core::roles::MemberDirectory;
use crate::core::state_machine::AttendanceStateMachine;
use crate::errors::{AppError, AppResult};
use crate::models::record::MemberId;
use crate::ui::messages::{success, warning};
use std::sync::Arc;

/// The member must hold at least one role with a configured limit.
fn ensure_authorized(cfg: &Config, member: &MemberId) -> AppResult<()> {
    let limits = cfg.role_limits()?;
    let roles = cfg.directory().qualifying_roles(member)?;
    if limits.effective_limit(roles.iter()).is_none() {
        return Err(AppError::NotAuthorized(member.clone()));
    }
    Ok(())
}

/// Handle `clock-in` and `clock-out`.
pub fn handle(cmd: &Commands, cfg: &Config, clock: Arc<dyn Clock>) -> AppResult<()> {
    let (member, clocking_in) = match cmd {
        Commands::ClockIn { member } => (MemberId::new(member.as_str()), true),
        Commands::ClockOut { member } => (MemberId::new(member.as_str()), false),
        _ => return Ok(()),
    };

    ensure_authorized(cfg, &member)?;

    let store = open_store(cfg)?;
    let notifier = LogNotifier::with_audit(Arc::clone(&store));
    let machine = AttendanceStateMachine::new(store);
    let now = clock.now();

    let notice = if clocking_in {
        machine.clock_in(&member, now)?;
        success(format!("{member} has clocked in."));
        Notice::ClockedIn { member, at: now }
    } else {
        let outcome = machine.clock_out(&member, now)?;
        success(format!(
            "{member} has clocked out: +{:.2}h (total {:.2}h).",
            outcome.delta_hours, outcome.record.accrued_hours
        ));
        Notice::ClockedOut {
            member,
            at: now,
            delta_hours: outcome.delta_hours,
        }
    };

    if let Err(e) = notifier.notify(&Channel::Admin, &notice, None) {
        warning(format!("Notification not delivered: {e}"));
    }
    Ok(())
}
