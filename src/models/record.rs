use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable member identity (the chat platform user id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Observable session state of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// No record exists for the member yet.
    Unknown,
    Idle,
    Active,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unknown => "unknown",
            SessionState::Idle => "idle",
            SessionState::Active => "active",
        }
    }
}

/// One row of the `attendance` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub member_id: MemberId,
    pub session_start: Option<DateTime<Utc>>, // ⇔ attendance.session_start (present iff open)
    pub session_end: Option<DateTime<Utc>>,   // ⇔ attendance.session_end (last close)
    pub accrued_hours: f64,                   // ⇔ attendance.accrued_hours
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Fresh record for a member seen for the first time.
    pub fn new(member_id: MemberId, now: DateTime<Utc>) -> Self {
        Self {
            member_id,
            session_start: None,
            session_end: None,
            accrued_hours: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session_start.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_open() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    /// Hours elapsed since the open session started, `None` when idle.
    pub fn elapsed_hours(&self, now: DateTime<Utc>) -> Option<f64> {
        self.session_start.map(|start| hours_between(start, now))
    }
}

/// Signed difference `end - start` in fractional hours.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}

/// Expected open state checked by a conditional upsert before mutating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedState {
    /// A session must be open.
    Open,
    /// No session may be open; an absent record also qualifies.
    NotOpen,
}

impl ExpectedState {
    pub fn matches(&self, record: Option<&AttendanceRecord>) -> bool {
        let open = record.is_some_and(AttendanceRecord::is_open);
        match self {
            ExpectedState::Open => open,
            ExpectedState::NotOpen => !open,
        }
    }
}

impl fmt::Display for ExpectedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedState::Open => f.write_str("open session"),
            ExpectedState::NotOpen => f.write_str("no open session"),
        }
    }
}
