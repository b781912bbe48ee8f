//! Integration tests for the lxd-provider CLI skeleton.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn lxd_provider() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lxd-provider"));
    cmd.env("NO_COLOR", "1");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    // Env-backed args count as given, which suppresses arg_required_else_help.
    Command::new(assert_cmd::cargo::cargo_bin!("lxd-provider"))
        .env_remove("NO_COLOR")
        .env_remove("LXD_PROVIDER_CONFIG")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Connect to LXD remotes and establish trust with them",
        ));
}

#[test]
fn test_no_color_accepts_any_non_empty_value() {
    for value in ["1", "true", "yes"] {
        lxd_provider()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("lxd-provider 0.1.0"));
    }
}

#[test]
fn test_empty_no_color_is_accepted() {
    lxd_provider()
        .env("NO_COLOR", "")
        .arg("version")
        .assert()
        .success();
}

#[test]
fn test_cli_help_flag_shows_help() {
    lxd_provider()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("remote"))
        .stdout(predicate::str::contains("--accept-remote-certificate"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    lxd_provider()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lxd-provider"));
}

#[test]
fn test_version_command_shows_version() {
    lxd_provider()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lxd-provider 0.1.0"));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = lxd_provider()
        .args(["version", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["version"], "0.1.0");
}

#[test]
fn test_version_command_quiet_prints_nothing() {
    lxd_provider()
        .args(["version", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// --- Command hierarchy tests ---

#[test]
fn test_remote_help_lists_subcommands() {
    lxd_provider()
        .args(["remote", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_remote_check_rejects_unknown_protocol() {
    lxd_provider()
        .args(["remote", "check", "--protocol", "ftp"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_unknown_subcommand_fails() {
    lxd_provider().arg("launch").assert().code(2);
}
