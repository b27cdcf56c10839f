//! Plan command integration tests.

use predicates::prelude::*;

use super::common::{RESOURCES, TASKS, TestEnv};

#[test]
fn plan_fresh_state_deploys_everything() {
  let env = TestEnv::from_fixture("minimal.toml");

  env
    .ironstep_cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains(format!(
      "Would deploy {} contract(s) and execute {} task(s)",
      RESOURCES, TASKS
    )));

  // Read-only: nothing deployed, no state written.
  assert!(!env.state_path().exists());
  assert!(!env.path("chain.json").exists());
}

#[test]
fn plan_after_deploy_has_nothing_to_do() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();

  env
    .ironstep_cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to do"));
}

#[test]
fn plan_json_reports_actions() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();
  let mut state = env.read_json("results.json");
  state.as_object_mut().unwrap().remove("task.treasury.addPool");
  std::fs::write(env.state_path(), serde_json::to_string_pretty(&state).unwrap()).unwrap();

  let output = env.ironstep_cmd().arg("plan").arg("--json").output().unwrap();
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let steps = plan["steps"].as_array().unwrap();
  assert_eq!(steps.len(), RESOURCES + TASKS);
  let add_pool = steps.iter().find(|s| s["name"] == "treasury.addPool").unwrap();
  assert_eq!(add_pool["action"], "execute");
  let treasury = steps.iter().find(|s| s["name"] == "Treasury").unwrap();
  assert_eq!(treasury["action"], "attach");
}
