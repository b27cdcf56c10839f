//! Verify command integration tests.

use predicates::prelude::*;

use super::common::{RESOURCES, TestEnv};

#[test]
fn verify_writes_script_next_to_config() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();
  let state = env.read_json("results.json");

  env
    .ironstep_cmd()
    .arg("verify")
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("Wrote {} verification command(s)", RESOURCES)));

  let script = std::fs::read_to_string(env.path("verify.sh")).unwrap();
  assert!(script.starts_with("#!/usr/bin/env sh\n\n"));
  assert!(script.contains(&format!(
    "# verify Treasury\nnpx hardhat verify --network bsc {}",
    state["Treasury"].as_str().unwrap()
  )));
  assert_eq!(script.matches("npx hardhat verify").count(), RESOURCES);
}

#[test]
fn verify_stdout() {
  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();

  env
    .ironstep_cmd()
    .arg("verify")
    .arg("--stdout")
    .assert()
    .success()
    .stdout(predicate::str::starts_with("#!/usr/bin/env sh"))
    .stdout(predicate::str::contains("\"BUSD\" \"18\""));

  assert!(!env.path("verify.sh").exists());
}

#[test]
fn verify_uses_configured_network_and_path() {
  let env = TestEnv::from_fixture("custom_paths.toml");
  env.deploy();

  env.ironstep_cmd().arg("verify").assert().success();

  let script = std::fs::read_to_string(env.path("out/verify.sh")).unwrap();
  assert!(script.contains("npx hardhat verify --network bsctest"));
}

#[test]
fn verify_without_entries() {
  let env = TestEnv::from_fixture("minimal.toml");

  env
    .ironstep_cmd()
    .arg("verify")
    .assert()
    .success()
    .stdout(predicate::str::contains("No verification entries"));
}

#[cfg(unix)]
#[test]
fn verify_script_is_executable() {
  use std::os::unix::fs::PermissionsExt;

  let env = TestEnv::from_fixture("minimal.toml");
  env.deploy();
  env.ironstep_cmd().arg("verify").assert().success();

  let mode = std::fs::metadata(env.path("verify.sh")).unwrap().permissions().mode();
  assert_eq!(mode & 0o111, 0o111);
}
