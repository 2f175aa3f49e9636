//! Command-line tests for the `bp` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn bp(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bp").unwrap();
    cmd.current_dir(dir.path()).env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    bp(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--capacity"));
}

#[test]
fn test_zero_capacity_exits_with_error() {
    let dir = TempDir::new().unwrap();
    bp(&dir)
        .args(["-p", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("capacity must be a positive integer"));
}

#[test]
fn test_dash_c_sets_server_count() {
    let dir = TempDir::new().unwrap();
    bp(&dir)
        .args(["-c", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("servers must be a positive integer"));
}

#[test]
fn test_oversized_capacity_exits_with_error() {
    let dir = TempDir::new().unwrap();
    bp(&dir)
        .args(["--capacity", "101"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exceeds the maximum"));
}

#[test]
fn test_invalid_config_file_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "explore-min-secs: 9\nexplore-max-secs: 2").unwrap();

    bp(&dir)
        .arg("--config")
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("explore-min-secs"));
}

#[test]
fn test_short_run_prints_final_report() {
    let dir = TempDir::new().unwrap();
    bp(&dir)
        .args(["-n", "2", "-d", "1", "-i", "1", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FINAL STATISTICS"))
        .stdout(predicate::str::contains("Simulation ended"));
}

#[test]
fn test_json_report() {
    let dir = TempDir::new().unwrap();
    let output = bp(&dir)
        .args(["-n", "2", "-d", "1", "--seed", "1", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["report"]["requesters_served"].is_u64());
    assert_eq!(value["requesters"].as_array().map(|r| r.len()), Some(2));
}
