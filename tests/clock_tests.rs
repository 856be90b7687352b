use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

mod common;
use common::Workspace;

#[test]
fn test_init_writes_default_settings() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(contains("initialization completed"));

    let settings = ws.read("settings.json");
    assert!(settings.contains("\"client_id\": \"\""));
    assert!(settings.contains("Sites.ReadWrite.All"));

    // a second init keeps the file
    ws.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(contains("already present"));
}

#[test]
fn test_clock_in_then_out_appends_one_row() {
    let ws = Workspace::new();
    ws.cmd().arg("init").assert().success();

    ws.cmd()
        .args(["in", "Fix bug", "--user", "W1", "--dept", "Ops"])
        .assert()
        .success()
        .stdout(contains("Clocked in on 'Fix bug'"));

    assert!(ws.read("session.json").contains("W1"));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Fix bug").and(contains("W1")));

    ws.cmd()
        .arg("out")
        .assert()
        .success()
        .stdout(contains("Clocked out of 'Fix bug'"));

    let ledger = ws.read("time_log.csv");
    let lines: Vec<&str> = ledger.lines().collect();
    assert_eq!(lines.len(), 1);

    let fields: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[1], "Fix bug");
    let start: f64 = fields[2].parse().unwrap();
    let end: f64 = fields[3].parse().unwrap();
    let hours: f64 = fields[4].parse().unwrap();
    assert!(end >= start);
    assert!(hours >= 0.0);
    assert!(fields[2].contains('.'));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Not clocked in"));
}

#[test]
fn test_clock_in_twice_is_rejected() {
    let ws = Workspace::new();
    ws.cmd().args(["in", "First"]).assert().success();

    ws.cmd()
        .args(["in", "Second"])
        .assert()
        .failure()
        .stderr(contains("already clocked in on 'First'"));
}

#[test]
fn test_clock_out_without_clock_in_fails_and_records_nothing() {
    let ws = Workspace::new();
    ws.cmd().arg("init").assert().success();

    ws.cmd()
        .arg("out")
        .assert()
        .failure()
        .stderr(contains("not clocked in"));

    assert!(!ws.path("time_log.csv").exists());
}

#[test]
fn test_blank_task_is_rejected() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["in", "   "])
        .assert()
        .failure()
        .stderr(contains("Please enter a task description"));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Not clocked in"));
}

#[test]
fn test_sessions_accumulate_in_order() {
    let ws = Workspace::with_session("First task");
    ws.cmd().args(["in", "Second task"]).assert().success();
    ws.cmd().arg("out").assert().success();

    let ledger = ws.read("time_log.csv");
    let tasks: Vec<&str> = ledger
        .lines()
        .map(|l| l.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(tasks, vec!["First task", "Second task"]);

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(
            contains("First task")
                .and(contains("Second task"))
                .and(contains("Total Hours Worked")),
        );
}

#[test]
fn test_list_on_empty_ledger() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No sessions recorded"));
}

#[test]
fn test_list_with_invalid_period_fails() {
    let ws = Workspace::with_session("Fix bug");
    ws.cmd()
        .args(["list", "--period", "2025-13"])
        .assert()
        .failure()
        .stderr(contains("Error"));
}

#[test]
fn test_list_period_outside_the_data_is_empty() {
    let ws = Workspace::with_session("Fix bug");
    ws.cmd()
        .args(["list", "--period", "1999"])
        .assert()
        .success()
        .stdout(contains("No sessions recorded"));
}

#[test]
fn test_malformed_ledger_row_is_reported() {
    let ws = Workspace::with_session("Fix bug");
    let mut ledger = ws.read("time_log.csv");
    ledger.push_str("2025-09-01,broken,not-a-number,1.0,1.0\n");
    std::fs::write(ws.path("time_log.csv"), ledger).unwrap();

    ws.cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("line 2"));
}

#[test]
fn test_shell_records_a_session() {
    let ws = Workspace::new();
    ws.cmd().arg("init").assert().success();

    ws.cmd()
        .arg("shell")
        .write_stdin("user W7\ndept Support\nin Answer tickets\nstatus\nout\nquit\n")
        .assert()
        .success()
        .stdout(
            contains("Clocked in at")
                .and(contains("Working on 'Answer tickets'"))
                .and(contains("Clocked out at")),
        );

    let ledger = ws.read("time_log.csv");
    assert_eq!(ledger.lines().count(), 1);
    assert!(ledger.contains("Answer tickets"));
    assert!(ws.read("session.json").contains("W7"));
}

#[test]
fn test_shell_keeps_going_after_an_error() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("shell")
        .write_stdin("out\nin\nin Write docs\n")
        .assert()
        .success()
        .stderr(contains("not clocked in").and(contains("Please enter a task description")))
        .stdout(contains("Still clocked in on 'Write docs'"));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Write docs"));
}
