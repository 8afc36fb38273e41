//! Notification collaborator: typed notices delivered to channels.

use crate::db::store::SqliteStore;
use crate::errors::{AppError, AppResult};
use crate::models::record::MemberId;
use crate::models::role::RoleId;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Admin,
    Member(MemberId),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Admin => f.write_str("admin"),
            Channel::Member(m) => write!(f, "member:{m}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ClockedIn {
        member: MemberId,
        at: DateTime<Utc>,
    },
    ClockedOut {
        member: MemberId,
        at: DateTime<Utc>,
        delta_hours: f64,
    },
    SessionExpired {
        member: MemberId,
        role: RoleId,
        limit_hours: f64,
        elapsed_hours: f64,
        closed_at: DateTime<Utc>,
    },
    RolloverCompleted {
        report: PathBuf,
        rows: usize,
        reset: usize,
        deleted: usize,
    },
    RolloverSkipped {
        reason: String,
    },
}

impl Notice {
    /// Short operation name used in the audit log.
    pub fn operation(&self) -> &'static str {
        match self {
            Notice::ClockedIn { .. } => "clock_in",
            Notice::ClockedOut { .. } => "clock_out",
            Notice::SessionExpired { .. } => "expire",
            Notice::RolloverCompleted { .. } => "rollover",
            Notice::RolloverSkipped { .. } => "rollover_skipped",
        }
    }

    pub fn target(&self) -> String {
        match self {
            Notice::ClockedIn { member, .. }
            | Notice::ClockedOut { member, .. }
            | Notice::SessionExpired { member, .. } => member.to_string(),
            Notice::RolloverCompleted { report, .. } => report.display().to_string(),
            Notice::RolloverSkipped { .. } => String::new(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ClockedIn { member, at } => {
                write!(f, "🟢 {member} has clocked in at {}", at.to_rfc3339())
            }
            Notice::ClockedOut {
                member,
                at,
                delta_hours,
            } => write!(
                f,
                "🔴 {member} has clocked out at {} ({delta_hours:.2}h)",
                at.to_rfc3339()
            ),
            Notice::SessionExpired {
                member,
                role,
                limit_hours,
                elapsed_hours,
                ..
            } => write!(
                f,
                "⚠️ {member} has exceeded the time limit of {limit_hours} hours for role {role} \
                 ({elapsed_hours:.2}h elapsed); the session was closed without credit"
            ),
            Notice::RolloverCompleted {
                rows,
                reset,
                deleted,
                ..
            } => write!(
                f,
                "📊 Weekly clock records exported ({rows} rows); totals reset for {reset} records, \
                 {deleted} records cleaned up"
            ),
            Notice::RolloverSkipped { reason } => {
                write!(f, "❌ Weekly rollover skipped: {reason}")
            }
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, channel: &Channel, notice: &Notice, attachment: Option<&Path>)
    -> AppResult<()>;
}

/// Renders notices through `tracing` and keeps an audit row in the `log`
/// table.
#[derive(Clone)]
pub struct LogNotifier {
    audit: Arc<SqliteStore>,
}

impl LogNotifier {
    pub fn with_audit(store: Arc<SqliteStore>) -> Self {
        Self { audit: store }
    }
}

impl Notifier for LogNotifier {
    fn notify(
        &self,
        channel: &Channel,
        notice: &Notice,
        attachment: Option<&Path>,
    ) -> AppResult<()> {
        match attachment {
            Some(path) => info!(%channel, attachment = %path.display(), "{notice}"),
            None => info!(%channel, "{notice}"),
        }

        if let Err(e) = self
            .audit
            .audit(notice.operation(), &notice.target(), &notice.to_string())
        {
            warn!(error = %e, "failed to write audit log row");
        }
        Ok(())
    }
}

/// Keeps every delivered notice in memory. Used by tests and by callers
/// that want to inspect what a sweep or rollover announced.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Channel, Notice, Option<PathBuf>)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following delivery fail.
    pub fn fail_deliveries(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(Channel, Notice, Option<PathBuf>)> {
        self.sent
            .lock()
            .map(|v| v.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        channel: &Channel,
        notice: &Notice,
        attachment: Option<&Path>,
    ) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Notify(format!(
                "delivery to {channel} refused"
            )));
        }
        let mut sent = self.sent.lock().unwrap_or_else(|p| p.into_inner());
        sent.push((
            channel.clone(),
            notice.clone(),
            attachment.map(Path::to_path_buf),
        ));
        Ok(())
    }
}
