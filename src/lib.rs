//! shiftclock library root.
//! Exposes CLI parser, high-level run() function, and internal modules.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod export;
pub mod models;
pub mod ui;
pub mod utils;

use chrono::{DateTime, Utc};
use clap::Parser;
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::clock::{Clock, ManualClock, SystemClock};
use crate::errors::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// Clock for this invocation: the real one, or a fixed instant from `--at`.
fn clock_for(cli: &Cli) -> AppResult<Arc<dyn Clock>> {
    match &cli.at {
        Some(raw) => {
            let at = DateTime::parse_from_rfc3339(raw)
                .map_err(|_| AppError::Config(format!("Invalid --at instant '{raw}'")))?;
            Ok(Arc::new(ManualClock::new(at.with_timezone(&Utc))))
        }
        None => Ok(Arc::new(SystemClock)),
    }
}

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let clock = clock_for(cli)?;
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => cli::commands::db::handle(&cli.command, cfg),
        Commands::Channels { .. } => cli::commands::channels::handle(&cli.command, cfg),
        Commands::ClockIn { .. } | Commands::ClockOut { .. } => {
            cli::commands::clock::handle(&cli.command, cfg, clock)
        }
        Commands::Hours { .. } => cli::commands::hours::handle(&cli.command, cfg),
        Commands::Status => cli::commands::status::handle(cfg, clock),
        Commands::Sweep => cli::commands::sweep::handle(cfg, clock),
        Commands::Export { .. } => cli::commands::export::handle(&cli.command, cfg, clock),
        Commands::Rollover { .. } => cli::commands::rollover::handle(&cli.command, cfg, clock),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::Serve => cli::commands::serve::handle(cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    // 1️⃣ parse CLI
    let cli = Cli::parse();

    // 2️⃣ load the configuration once
    let mut cfg = match &cli.config {
        Some(path) if !Path::new(path).exists() => {
            return Err(AppError::Config(format!("Config file not found: {path}")));
        }
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    // 3️⃣ command-line database override
    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }

    // 4️⃣ hand everything to the dispatcher
    dispatch(&cli, &cfg)
}
