use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;

mod common;
use common::{clock_in, clock_out, init, sc_in, workspace};

#[test]
fn test_init_creates_database() {
    let ws = workspace();

    sc_in(&ws)
        .args(["--test", "init"])
        .assert()
        .success()
        .stdout(contains("Database initialized"));

    assert!(std::path::Path::new(&ws.db).exists());
}

#[test]
fn test_clock_in_twice_is_refused() {
    let ws = workspace();
    init(&ws);

    clock_in(&ws, "alice", "2025-06-02T08:00:00Z");

    sc_in(&ws)
        .args(["--at", "2025-06-02T09:00:00Z", "clock-in", "alice"])
        .assert()
        .failure()
        .stderr(contains("already has an active session"));
}

#[test]
fn test_clock_out_without_session_is_refused() {
    let ws = workspace();
    init(&ws);

    sc_in(&ws)
        .args(["clock-out", "alice"])
        .assert()
        .failure()
        .stderr(contains("has no active session"));
}

#[test]
fn test_clock_out_credits_elapsed_hours() {
    let ws = workspace();
    init(&ws);

    clock_in(&ws, "alice", "2025-06-02T08:00:00Z");

    sc_in(&ws)
        .args(["--at", "2025-06-02T13:00:00Z", "clock-out", "alice"])
        .assert()
        .success()
        .stdout(contains("+5.00h"));

    sc_in(&ws)
        .args(["hours", "alice"])
        .assert()
        .success()
        .stdout(contains("5.00h this cycle").and(contains("state idle")));
}

#[test]
fn test_member_without_qualifying_role_cannot_clock_in() {
    let ws = workspace();
    init(&ws);

    sc_in(&ws)
        .args(["clock-in", "guest"])
        .assert()
        .failure()
        .stderr(contains("not allowed"));

    sc_in(&ws)
        .args(["hours", "guest"])
        .assert()
        .success()
        .stdout(contains("no attendance record"));
}

#[test]
fn test_sweep_expires_only_sessions_past_their_limit() {
    let ws = workspace();
    init(&ws);

    // bob's smallest limit is the team leader one (12.25h), alice has 16.25h
    clock_in(&ws, "bob", "2025-06-02T08:00:00Z");
    clock_in(&ws, "alice", "2025-06-02T08:00:00Z");

    sc_in(&ws)
        .args(["--at", "2025-06-02T20:30:00Z", "sweep"])
        .assert()
        .success()
        .stdout(
            contains("Session of bob expired")
                .and(contains("Session of alice").not())
                .and(contains("1 within limit")),
        );

    sc_in(&ws)
        .args(["hours", "bob"])
        .assert()
        .success()
        .stdout(contains("0.00h this cycle").and(contains("state idle")));

    sc_in(&ws)
        .args(["--at", "2025-06-02T20:30:00Z", "status"])
        .assert()
        .success()
        .stdout(contains("alice").and(contains("active")));
}

#[test]
fn test_export_csv_uses_rounded_totals() {
    let ws = workspace();
    init(&ws);

    clock_in(&ws, "alice", "2025-06-02T08:00:00Z");
    clock_out(&ws, "alice", "2025-06-02T15:30:00Z");

    let out = ws.dir.path().join("report.csv");
    sc_in(&ws)
        .args(["export", "--file", &out.to_string_lossy(), "--force"])
        .assert()
        .success()
        .stdout(contains("CSV export completed"));

    let content = fs::read_to_string(&out).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("memberId,displayName,totalHours"));
    assert_eq!(lines.next(), Some("alice,Alice,8"));
}

#[test]
fn test_export_json_format() {
    let ws = workspace();
    init(&ws);

    clock_in(&ws, "bob", "2025-06-02T08:00:00Z");
    clock_out(&ws, "bob", "2025-06-02T15:00:00Z");

    let out = ws.dir.path().join("report.json");
    sc_in(&ws)
        .args([
            "export",
            "--format",
            "json",
            "--file",
            &out.to_string_lossy(),
        ])
        .assert()
        .success();

    let rows: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(rows[0]["memberId"], "bob");
    assert_eq!(rows[0]["displayName"], "Bob");
    assert_eq!(rows[0]["totalHours"], 7);
}

#[test]
fn test_export_json_default_file_has_json_extension() {
    let ws = workspace();
    init(&ws);

    clock_in(&ws, "alice", "2025-06-02T08:00:00Z");
    clock_out(&ws, "alice", "2025-06-02T10:00:00Z");

    sc_in(&ws)
        .args(["--at", "2025-06-02T10:00:00Z", "export", "--format", "json"])
        .assert()
        .success()
        .stdout(contains("clock_records_2025-06-02.json"));

    assert!(!ws.export_dir.join("clock_records_2025-06-02.csv").exists());
    let rows: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(ws.export_dir.join("clock_records_2025-06-02.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(rows[0]["memberId"], "alice");
    assert_eq!(rows[0]["totalHours"], 2);
}

#[test]
fn test_export_with_no_records() {
    let ws = workspace();
    init(&ws);

    sc_in(&ws)
        .args(["export"])
        .assert()
        .success()
        .stdout(contains("No attendance records to export"));
}

#[test]
fn test_rollover_next_before_target_time() {
    let ws = workspace();

    // Wednesday 05:00 at UTC+8
    sc_in(&ws)
        .args(["--at", "2025-06-03T21:00:00Z", "rollover", "--next"])
        .assert()
        .success()
        .stdout(contains("Wednesday 2025-06-04 06:00 +08:00").and(contains("1h 0m")));
}

#[test]
fn test_rollover_now_exports_then_resets() {
    let ws = workspace();
    init(&ws);

    clock_in(&ws, "alice", "2025-06-02T08:00:00Z");
    clock_out(&ws, "alice", "2025-06-02T12:00:00Z");

    sc_in(&ws)
        .args(["--at", "2025-06-03T22:00:00Z", "rollover", "--now"])
        .assert()
        .success()
        .stdout(contains("Rollover completed: 1 row(s)"));

    let report = ws.export_dir.join("clock_records_2025-06-03.csv");
    let content = fs::read_to_string(&report).unwrap();
    assert!(content.contains("alice,Alice,4"));

    sc_in(&ws)
        .args(["hours", "alice"])
        .assert()
        .success()
        .stdout(contains("0.00h this cycle"));
}

#[test]
fn test_rollover_now_keeps_totals_when_export_fails() {
    let ws = workspace();
    init(&ws);

    clock_in(&ws, "alice", "2025-06-02T08:00:00Z");
    clock_out(&ws, "alice", "2025-06-02T12:00:00Z");

    // a plain file where the export directory should be
    fs::write(&ws.export_dir, "not a directory").unwrap();

    sc_in(&ws)
        .args(["--at", "2025-06-03T22:00:00Z", "rollover", "--now"])
        .assert()
        .failure()
        .stderr(contains("Export failed"));

    sc_in(&ws)
        .args(["hours", "alice"])
        .assert()
        .success()
        .stdout(contains("4.00h this cycle"));
}

#[test]
fn test_channels_are_initialized_once() {
    let ws = workspace();
    init(&ws);

    let pairs = [
        "category=100",
        "clock_in_channel=101",
        "clock_in_interface=102",
        "clock_out_channel=103",
        "clock_out_interface=104",
        "admin_channel=105",
        "clock_in_role=106",
    ];

    sc_in(&ws)
        .args(["channels", "--print"])
        .assert()
        .failure()
        .stderr(contains("not initialized"));

    sc_in(&ws)
        .arg("channels")
        .arg("--set")
        .args(pairs)
        .assert()
        .success()
        .stdout(contains("Clock channels stored"));

    sc_in(&ws)
        .arg("channels")
        .arg("--set")
        .args(pairs)
        .assert()
        .failure()
        .stderr(contains("already initialized"));

    sc_in(&ws)
        .args(["channels", "--print"])
        .assert()
        .success()
        .stdout(contains("admin channel        105"));

    sc_in(&ws)
        .args(["channels", "--clear"])
        .assert()
        .success()
        .stdout(contains("Clock channels removed"));
}

#[test]
fn test_log_print_shows_transitions() {
    let ws = workspace();
    init(&ws);

    clock_in(&ws, "alice", "2025-06-02T08:00:00Z");

    sc_in(&ws)
        .args(["log", "--print"])
        .assert()
        .success()
        .stdout(contains("clock_in").and(contains("alice")).and(contains("init")));
}

#[test]
fn test_missing_config_file_is_reported() {
    let ws = workspace();
    let missing = ws.dir.path().join("nope.conf");

    common::sc()
        .args(["--config", &missing.to_string_lossy(), "status"])
        .assert()
        .failure()
        .stderr(contains("Config file not found"));
}
