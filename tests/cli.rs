// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 agentflow contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const SEARCH_AND_SUMMARIZE: &str = r#"
name: poles
steps:
  - capability: image_search
    intent: utility poles
  - capability: document_search
    intent: maintenance records
  - capability: assistant
    intent: summarize what was found
    depends_on: [0, 1]
"#;

fn workspace(pipeline: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".agentflow.pipeline.yaml"), pipeline).unwrap();
    dir
}

fn agentflow(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("agentflow").unwrap();
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .env_remove("AGENTFLOW_TIMEOUT")
        .env_remove("AGENTFLOW_MAX_CONCURRENCY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_prints() {
    Command::cargo_bin("agentflow")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("contracts"));
}

#[test]
fn simulated_run_succeeds() {
    let dir = workspace(SEARCH_AND_SUMMARIZE);

    agentflow(&dir)
        .args(["run", "--simulate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wave 2:"))
        .stdout(predicate::str::contains("Pipeline completed successfully"));
}

#[test]
fn simulated_run_as_json() {
    let dir = workspace(SEARCH_AND_SUMMARIZE);

    let output = agentflow(&dir)
        .args(["run", "--simulate", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["total_waves"], 2);
    assert_eq!(result["steps"][2]["status"], "completed");
}

#[test]
fn run_without_commands_suggests_simulate() {
    let dir = workspace(SEARCH_AND_SUMMARIZE);

    agentflow(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No capability registered"));
}

#[test]
fn failing_command_fails_run() {
    let dir = workspace(
        r#"
steps:
  - capability: link_search
    intent: vendors
"#,
    );
    fs::write(
        dir.path().join(".agentflow.yaml"),
        "commands:\n  link_search:\n    command: \"echo broken >&2; exit 3\"\n    shell: sh\n",
    )
    .unwrap();

    agentflow(&dir)
        .arg("run")
        .assert()
        .failure()
        .stdout(predicate::str::contains("command exited with code 3"));
}

#[test]
fn validate_reports_forward_dependency() {
    let dir = workspace(
        r#"
steps:
  - capability: image_search
    intent: poles
    depends_on: [1]
  - capability: document_search
    intent: records
"#,
    );

    agentflow(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("depends_on"));
}

#[test]
fn validate_accepts_valid_pipeline() {
    let dir = workspace(SEARCH_AND_SUMMARIZE);

    agentflow(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline is valid!"));
}

#[test]
fn validate_missing_file() {
    let dir = TempDir::new().unwrap();

    agentflow(&dir)
        .args(["validate", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn graph_as_mermaid() {
    let dir = workspace(SEARCH_AND_SUMMARIZE);

    agentflow(&dir)
        .args(["graph", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s0 --> s2"))
        .stdout(predicate::str::contains("s1 --> s2"));
}

#[test]
fn contracts_list_every_capability() {
    let dir = TempDir::new().unwrap();

    agentflow(&dir)
        .arg("contracts")
        .assert()
        .success()
        .stdout(predicate::str::contains("cross_reference"))
        .stdout(predicate::str::contains("image_ids: image_id_list"));
}

#[test]
fn config_flag_rejects_unknown_capability() {
    let dir = workspace(SEARCH_AND_SUMMARIZE);
    fs::write(dir.path().join("agentflow.toml"), "[timeouts]\nteleport = 5\n").unwrap();

    agentflow(&dir)
        .args(["--config", "agentflow.toml", "run", "--simulate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("teleport"));
}
