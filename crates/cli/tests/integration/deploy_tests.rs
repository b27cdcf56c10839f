//! Deploy command integration tests.

use predicates::prelude::*;

use super::common::{RESOURCES, TASKS, TestEnv};

#[test]
fn deploy_fresh_state() {
  let env = TestEnv::from_fixture("minimal.toml");

  env
    .ironstep_cmd()
    .arg("deploy")
    .assert()
    .success()
    .stdout(predicate::str::contains("Deployment complete"))
    .stdout(predicate::str::contains(format!("Deployed: {}", RESOURCES)))
    .stdout(predicate::str::contains(format!("Transactions: {}", RESOURCES + TASKS)));

  let state = env.read_json("results.json");
  let entries = state.as_object().unwrap();
  assert_eq!(entries.len(), RESOURCES * 2 + TASKS);
  assert!(entries.contains_key("Treasury"));
  assert!(entries.contains_key("verify-Treasury"));
  assert!(entries.contains_key("task.treasury.addPool"));
  assert!(env.path("chain.json").exists());
}

#[test]
fn deploy_is_idempotent() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();
  let first = std::fs::read_to_string(env.state_path()).unwrap();

  env
    .ironstep_cmd()
    .arg("deploy")
    .assert()
    .success()
    .stdout(predicate::str::contains("Transactions: 0"))
    .stdout(predicate::str::contains(format!("Attached: {}", RESOURCES)));

  assert_eq!(std::fs::read_to_string(env.state_path()).unwrap(), first);
}

#[test]
fn deploy_redeploys_contract_missing_from_chain() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();

  // Drop Treasury from the simulated chain.
  let state = env.read_json("results.json");
  let treasury = state["Treasury"].as_str().unwrap().to_ascii_lowercase();
  let mut chain = env.read_json("chain.json");
  chain["contracts"].as_object_mut().unwrap().remove(&treasury).unwrap();
  std::fs::write(env.path("chain.json"), serde_json::to_string_pretty(&chain).unwrap()).unwrap();

  env
    .ironstep_cmd()
    .arg("deploy")
    .assert()
    .success()
    .stdout(predicate::str::contains("Redeployed: 1"))
    .stdout(predicate::str::contains("Deployed: 6"))
    .stdout(predicate::str::contains(format!("Executed: {}", TASKS)));

  let after = env.read_json("results.json");
  assert_ne!(after["Treasury"], state["Treasury"]);
  assert_eq!(after["MockBUSD"], state["MockBUSD"]);
  assert_eq!(after["verify-Dollar"], state["verify-Dollar"]);
}

#[test]
fn deploy_verbose_lists_names() {
  let env = TestEnv::from_fixture("minimal.toml");

  env
    .ironstep_cmd()
    .arg("-v")
    .arg("deploy")
    .assert()
    .success()
    .stdout(predicate::str::contains("Deployed: MockBUSD, Timelock, Treasury"));
}

#[test]
fn deploy_honors_state_override() {
  let env = TestEnv::from_fixture("minimal.toml");

  env
    .ironstep_cmd()
    .arg("--state")
    .arg("elsewhere/state.json")
    .arg("deploy")
    .assert()
    .success();

  assert!(env.path("elsewhere/state.json").exists());
  assert!(!env.state_path().exists());
}

#[test]
fn deploy_uses_configured_paths() {
  let env = TestEnv::from_fixture("custom_paths.toml");

  env
    .ironstep_cmd()
    .arg("deploy")
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("Executed: {}", TASKS + 4)));

  let state = env.read_json("state/results.json");
  assert!(state.get("PoolUSDC").is_some());
  assert!(state.get("task.oracle_DOLLAR_USDC.update").is_some());
}

#[test]
fn deploy_missing_config_fails() {
  let env = TestEnv::from_fixture("minimal.toml");
  std::fs::remove_file(&env.config_path).unwrap();

  env
    .ironstep_cmd()
    .arg("deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn deploy_invalid_config_fails() {
  let env = TestEnv::from_fixture("minimal.toml");
  let content = std::fs::read_to_string(&env.config_path).unwrap();
  std::fs::write(&env.config_path, content.replace("symbol = \"BUSD\"", "symbol = \"BU-SD\"")).unwrap();

  env
    .ironstep_cmd()
    .arg("deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("collateral.symbol"));
}

#[cfg(unix)]
#[test]
fn rejected_deploy_exits_one_and_flushes() {
  let env = TestEnv::from_fixture("rejecting_ledger.toml");

  env
    .ironstep_cmd()
    .arg("deploy")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Deployment failed"))
    .stderr(predicate::str::contains("MockBUSD"));

  let state = env.read_json("results.json");
  assert!(state.as_object().unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn sigterm_mid_deploy_flushes_completed_steps() {
  use std::process::{Command, Stdio};
  use std::time::{Duration, Instant};

  let env = TestEnv::from_fixture("stalling_ledger.toml");
  let child = Command::new(env!("CARGO_BIN_EXE_ironstep"))
    .current_dir(env.temp.path())
    .env_remove("IRONSTEP_CONFIG")
    .env_remove("IRONSTEP_STATE")
    .env_remove("RUST_LOG")
    .arg("-c")
    .arg(&env.config_path)
    .arg("deploy")
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .unwrap();

  // The ledger drops a marker once it starts hanging on the fourth deployment.
  let deadline = Instant::now() + Duration::from_secs(30);
  while !env.path("stalled").exists() {
    assert!(Instant::now() < deadline, "ledger never reached the fourth deployment");
    std::thread::sleep(Duration::from_millis(50));
  }

  let killed = Command::new("kill")
    .arg("-TERM")
    .arg(child.id().to_string())
    .status()
    .unwrap();
  assert!(killed.success());

  let output = child.wait_with_output().unwrap();
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr);
  assert!(stderr.contains("Deployment interrupted by SIGTERM"), "stderr: {}", stderr);

  let state = env.read_json("results.json");
  let mut keys: Vec<&str> = state.as_object().unwrap().keys().map(String::as_str).collect();
  keys.sort_unstable();
  assert_eq!(
    keys,
    vec![
      "MockBUSD",
      "Timelock",
      "Treasury",
      "verify-MockBUSD",
      "verify-Timelock",
      "verify-Treasury"
    ]
  );
  assert_eq!(std::fs::read_to_string(env.path("deploys")).unwrap().trim(), "4");
}

#[cfg(unix)]
#[test]
fn concurrent_deploy_is_refused() {
  use ironstep_lib::store_lock::{LockMode, StoreLock};

  let env = TestEnv::from_fixture("minimal.toml");
  let _held = StoreLock::acquire(&env.state_path(), LockMode::Exclusive, "deploy").unwrap();

  env
    .ironstep_cmd()
    .arg("deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("locked by another process"));

  assert!(!env.state_path().exists());
}
