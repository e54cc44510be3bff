//! Integration tests for the `og` binary.
//!
//! Each test runs in a scratch directory with `HOME` and `XDG_CONFIG_HOME`
//! pointed inside it, so no real user configuration is read or written.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for running og, isolated from the user's environment.
fn og(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("og").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("OWNERGRAPH_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn version_flag_works() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("og"));
}

#[test]
fn weak_demo_prints_lifecycle_in_order() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["demo", "weak"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "=== weak ===\nNode 10 created (#0.0)\nNode 20 created (#1.0)\n",
        ))
        .stdout(predicate::str::contains("Parent value: 10"))
        .stdout(predicate::str::contains(
            "Node 10 destroyed (#0.0)\nNode 20 destroyed (#1.0)",
        ))
        .stdout(predicate::str::contains("audit: ok"));
}

#[test]
fn quiet_suppresses_transcript() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["demo", "shared", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn demo_all_json_covers_every_scenario() {
    let dir = TempDir::new().unwrap();
    let output = og(dir.path())
        .args(["demo", "all", "--json", "--iterations", "2", "--resource-size", "4"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let transcripts = value.as_array().unwrap();
    let names: Vec<&str> = transcripts
        .iter()
        .map(|t| t["scenario"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            "unique", "shared", "weak", "cycle", "chain", "self-ref", "buffer", "move-only",
            "perf"
        ]
    );
    assert_eq!(transcripts[2]["verify"]["ok"], true);
    assert!(transcripts[6].get("verify").is_none());
}

#[test]
fn chain_length_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".ownergraph.toml"),
        "[demo]\nchain_length = 2\n",
    )
    .unwrap();

    og(dir.path())
        .args(["demo", "chain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chain of 2 node(s)"));

    og(dir.path())
        .args(["demo", "chain", "--chain-length", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("head released: 4 node(s) destroyed"));
}

#[test]
fn list_names_every_scenario() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-ref"))
        .stdout(predicate::str::contains("move-only"));
}

#[test]
fn unknown_scenario_is_rejected() {
    let dir = TempDir::new().unwrap();
    og(dir.path()).args(["demo", "nope"]).assert().failure();
}

#[test]
fn config_set_then_get_with_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    let path_arg = path.to_str().unwrap();

    og(dir.path())
        .args(["--config", path_arg, "config", "set", "graph.cycle_policy", "allow"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set graph.cycle_policy = allow"));
    assert!(fs::read_to_string(&path).unwrap().contains("cycle_policy = \"allow\""));

    og(dir.path())
        .args(["--config", path_arg, "config", "get", "graph.cycle_policy"])
        .assert()
        .success()
        .stdout("allow\n");
}

#[test]
fn config_get_reports_defaults() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["config", "get", "demo.chain_length"])
        .assert()
        .success()
        .stdout("5\n");
}

#[test]
fn config_set_project_writes_dotfile() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["config", "set", "demo.iterations", "7", "--project"])
        .assert()
        .success();
    assert!(dir.path().join(".ownergraph.toml").exists());

    og(dir.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo.iterations = 7"))
        .stdout(predicate::str::contains("graph.cycle_policy = reject"));
}

#[test]
fn config_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["config", "get", "graph.colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key: graph.colour"));
}

#[test]
fn config_invalid_value_leaves_file_alone() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["config", "set", "demo.chain_length", "0", "--project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("demo.chain_length must be between 1"));
    assert!(!dir.path().join(".ownergraph.toml").exists());
}

#[test]
fn oversized_perf_flags_fail_cleanly() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args([
            "demo",
            "perf",
            "--iterations",
            "1",
            "--resource-size",
            "18446744073709551615",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid demo options"))
        .stderr(predicate::str::contains("demo.resource_size must be at most"));
}

#[test]
fn zero_chain_length_flag_is_rejected() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["demo", "chain", "--chain-length", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("demo.chain_length must be between 1"));
}

#[test]
fn oversized_iterations_are_not_written() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["config", "set", "demo.iterations", "1000000000000000", "--project"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("demo.iterations must be between 1"));
    assert!(!dir.path().join(".ownergraph.toml").exists());
}

#[test]
fn config_set_checks_limits_against_other_file() {
    let dir = TempDir::new().unwrap();
    let global = dir.path().join("global.toml");
    fs::write(&global, "[demo]\niterations = 5000\n").unwrap();

    og(dir.path())
        .args(["--config", global.to_str().unwrap()])
        .args(["config", "set", "demo.resource_size", "20000", "--project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("demo.iterations * demo.resource_size"));
    assert!(!dir.path().join(".ownergraph.toml").exists());
}

#[test]
fn malformed_project_config_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".ownergraph.toml"), "[graph]\nbogus = 1\n").unwrap();
    og(dir.path())
        .args(["demo", "unique"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn completion_generates_script() {
    let dir = TempDir::new().unwrap();
    og(dir.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("og"));
}
