use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PROVIDER_KEYS: &[&str] = &[
    "GOOGLE_API_KEY",
    "GOOGLE_CSE_ID",
    "NEWS_API_KEY",
    "GROQ_API_KEY",
    "ORGSCOPE_DB",
    "ORGSCOPE_STRATEGY",
];

/// Run in `dir` with no provider credentials so nothing reaches the network
fn orgscope(dir: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("orgscope").into();
    cmd.current_dir(dir);
    for key in PROVIDER_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn binary_runs() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("orgscope"));
}

#[test]
fn process_requires_a_name() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path()).arg("process").assert().failure();
}

#[test]
fn process_rejects_blank_name() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path())
        .args(["process", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("organization name is empty"));
}

#[test]
fn interactive_quits() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path())
        .arg("interactive")
        .write_stdin("quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Enter organization name"));

    assert!(tmp.path().join("political_orgs.db").exists());
}

#[test]
fn db_flag_overrides_default_path() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path())
        .args(["--db", "custom.db", "interactive"])
        .write_stdin("")
        .assert()
        .success();

    assert!(tmp.path().join("custom.db").exists());
    assert!(!tmp.path().join("political_orgs.db").exists());
}

#[test]
fn model_strategy_needs_credentials() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path())
        .args(["--strategy", "model", "process", "Acme Org"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GROQ_API_KEY"));
}

#[test]
fn unknown_strategy_is_rejected() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path())
        .args(["--strategy", "magic", "interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown extraction strategy"));
}

#[test]
fn report_needs_credentials() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path())
        .args(["report", "python language"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_API_KEY"));
}

#[test]
fn search_needs_credentials() {
    let tmp = TempDir::new().unwrap();
    orgscope(tmp.path())
        .args(["search", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_CSE_ID"));
}
