//! End-to-end tests of the `rexctl` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const NOW: &str = "2024-01-01T00:00:00Z";

fn rexctl(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rexctl").unwrap();
    cmd.arg("--state")
        .arg(dir.join("world.json"))
        .arg("--config")
        .arg(dir.join("rex.toml"))
        .arg("--now")
        .arg(NOW);
    cmd
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("rex.toml"), "require_voting = false\n").unwrap();
    rexctl(dir.path())
        .args([
            "genesis",
            "--core",
            "4,EOS",
            "--account",
            "alice=1000.0000 EOS",
            "--account",
            "bob=50.0000 EOS",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));
    rexctl(dir.path()).args(["init", "4,EOS"]).assert().success();
    dir
}

#[test]
fn test_help_lists_actions() {
    Command::cargo_bin("rexctl")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("buyrex"))
        .stdout(predicate::str::contains("rentcpu"));
}

#[test]
fn test_genesis_refuses_to_overwrite() {
    let dir = setup();
    rexctl(dir.path())
        .args(["genesis", "--core", "4,EOS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_deposit_and_buyrex() {
    let dir = setup();
    rexctl(dir.path())
        .args(["deposit", "alice", "100.0000 EOS"])
        .assert()
        .success();
    rexctl(dir.path())
        .args(["buyrex", "alice", "100.0000 EOS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("buyresult"))
        .stdout(predicate::str::contains("1000000.0000 REX"));

    rexctl(dir.path())
        .args(["show", "account", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1000000.0000 REX"));
    rexctl(dir.path())
        .args(["show", "chain", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("900.0000 EOS"));
}

#[test]
fn test_failed_action_leaves_world_untouched() {
    let dir = setup();
    let world = dir.path().join("world.json");
    let before = std::fs::read_to_string(&world).unwrap();

    rexctl(dir.path())
        .args(["withdraw", "bob", "1.0000 EOS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("withdraw failed"))
        .stderr(predicate::str::contains("must deposit to REX fund first"));

    assert_eq!(std::fs::read_to_string(&world).unwrap(), before);
}

#[test]
fn test_signer_must_match_authorizer() {
    let dir = setup();
    rexctl(dir.path())
        .args(["--signer", "bob", "deposit", "alice", "1.0000 EOS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing authority of alice"));
}

#[test]
fn test_show_pool_before_any_purchase() {
    let dir = setup();
    rexctl(dir.path())
        .args(["show", "pool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pool\": null"));
}

#[test]
fn test_missing_world_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("rex.toml"), "").unwrap();
    rexctl(dir.path())
        .args(["show", "pool"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading world"));
}
