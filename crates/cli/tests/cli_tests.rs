use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("pipeline-crm").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Multi-tenant sales pipeline server"));
}

#[test]
fn test_cli_serve_help() {
    let mut cmd = Command::cargo_bin("pipeline-crm").unwrap();
    cmd.arg("serve").arg("--help").assert().success().stdout(predicate::str::contains("port"));
}

#[test]
fn test_seed_then_stats() {
    let temp = tempfile::tempdir().unwrap();
    let db = temp.path().join("crm.db");

    let mut cmd = Command::cargo_bin("pipeline-crm").unwrap();
    cmd.arg("seed")
        .arg("--db")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("X-User-Id"));

    let mut cmd = Command::cargo_bin("pipeline-crm").unwrap();
    cmd.arg("stats")
        .arg("--db")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"opportunity_count\": 4"));
}
