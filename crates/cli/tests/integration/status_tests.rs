//! Status command integration tests.

use predicates::prelude::*;

use super::common::{RESOURCES, TASKS, TestEnv};

#[test]
fn status_empty_state() {
  let env = TestEnv::from_fixture("minimal.toml");

  env
    .ironstep_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("No recorded steps"));
}

#[test]
fn status_after_deploy() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();

  env
    .ironstep_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("Resources: {}", RESOURCES)))
    .stdout(predicate::str::contains(format!("Tasks: {}", TASKS)))
    .stdout(predicate::str::contains("treasury.addPool (tx 0x"));
}

#[test]
fn status_json_matches_state_file() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();
  let state = env.read_json("results.json");

  let output = env.ironstep_cmd().arg("status").arg("--json").output().unwrap();
  assert!(output.status.success());

  let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(status["resources"].as_object().unwrap().len(), RESOURCES);
  assert_eq!(status["resources"]["Treasury"], state["Treasury"]);
  assert_eq!(status["tasks"]["treasury.addPool"]["kind"], "transaction");
  assert_eq!(status["verify"]["Dollar"].as_array().unwrap().len(), 3);
  assert!(status["unknown"].as_array().unwrap().is_empty());
}

#[test]
fn status_flags_entries_outside_the_plan() {
  let env = TestEnv::from_fixture("minimal.toml");
  std::fs::write(
    env.state_path(),
    r#"{ "LegacyBoardroom": "0x5FbDB2315678afecb367f032d93F642f64180aa3", "task.legacy.init": "" }"#,
  )
  .unwrap();

  env
    .ironstep_cmd()
    .arg("status")
    .assert()
    .success()
    .stderr(predicate::str::contains("LegacyBoardroom"))
    .stderr(predicate::str::contains("task.legacy.init"));
}

#[test]
fn call_reads_wired_address() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();
  let state = env.read_json("results.json");

  let output = env
    .ironstep_cmd()
    .args(["call", "Treasury", "dollarAddress"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(value, state["Dollar"]);
}

#[test]
fn call_undeployed_resource_fails() {
  let env = TestEnv::from_fixture("minimal.toml");

  env
    .ironstep_cmd()
    .args(["call", "Treasury", "dollarAddress"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("has not been deployed"));
}
