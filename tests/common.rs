#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Scratch directory holding a database, a config file and an export dir.
pub struct Workspace {
    pub dir: TempDir,
    pub db: String,
    pub config: String,
    pub export_dir: PathBuf,
}

const MEMBERS: &str = r#"
members:
  - id: alice
    display_name: Alice
    roles: [chatter]
  - id: bob
    display_name: Bob
    roles: [team_leader, chatter]
  - id: guest
    display_name: Guest
    roles: [visitor]
"#;

/// Create a workspace whose config lists alice (chatter), bob (team leader
/// and chatter) and guest (no qualifying role).
pub fn workspace() -> Workspace {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = dir.path().join("shiftclock.sqlite");
    let export_dir = dir.path().join("exports");
    let config = dir.path().join("shiftclock.conf");

    let yaml = format!(
        "database: '{}'\nexport_dir: '{}'\n{}",
        db.display(),
        export_dir.display(),
        MEMBERS
    );
    fs::write(&config, yaml).expect("write config");

    Workspace {
        db: db.to_string_lossy().to_string(),
        config: config.to_string_lossy().to_string(),
        export_dir,
        dir,
    }
}

pub fn sc() -> Command {
    cargo_bin_cmd!("shiftclock")
}

/// Command bound to the workspace database and config.
pub fn sc_in(ws: &Workspace) -> Command {
    let mut cmd = sc();
    cmd.args(["--db", &ws.db, "--config", &ws.config]);
    cmd
}

/// Initialize the workspace database.
pub fn init(ws: &Workspace) {
    sc_in(ws).args(["--test", "init"]).assert().success();
}

pub fn clock_in(ws: &Workspace, member: &str, at: &str) {
    sc_in(ws)
        .args(["--at", at, "clock-in", member])
        .assert()
        .success();
}

pub fn clock_out(ws: &Workspace, member: &str, at: &str) {
    sc_in(ws)
        .args(["--at", at, "clock-out", member])
        .assert()
        .success();
}
