//! Unified application error type.
//! All modules (db, core, export, cli) return AppError to keep the error
//! handling consistent and easy to manage.

use crate::models::record::MemberId;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Conditional update rejected for member {member}: expected {expected}")]
    Conflict { member: MemberId, expected: String },

    #[error("Invalid stored value: {0}")]
    InvalidStoredValue(String),

    // ---------------------------
    // Session state machine
    // ---------------------------
    #[error("Member {0} already has an active session")]
    AlreadyActive(MemberId),

    #[error("Member {0} has no active session")]
    NoActiveSession(MemberId),

    #[error("Session for member {member} is within its limit ({elapsed:.2}h of {limit}h)")]
    LimitNotExceeded {
        member: MemberId,
        elapsed: f64,
        limit: f64,
    },

    // ---------------------------
    // Singleton channel configuration
    // ---------------------------
    #[error("Clock channels are already initialized")]
    AlreadyInitialized,

    #[error("Clock channels are not initialized")]
    NotInitialized,

    // ---------------------------
    // Collaborators
    // ---------------------------
    #[error("Member directory error: {0}")]
    Directory(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Member {0} is not allowed to clock in or out")]
    NotAuthorized(MemberId),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    // ---------------------------
    // Export errors
    // ---------------------------
    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

pub type AppResult<T> = Result<T, AppError>;
