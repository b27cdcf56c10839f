//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Number of contracts the default protocol plan deploys.
pub const RESOURCES: usize = 13;

/// Number of wiring tasks in the default protocol plan.
pub const TASKS: usize = 6;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated deployment directory.
///
/// Each test gets its own temporary directory holding the config, the state
/// file and the simulated chain.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  /// Create from a fixture file, copied to `ironstep.toml`.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("ironstep.toml");
    std::fs::write(&config_path, fixture_content(name)).unwrap();
    Self { temp, config_path }
  }

  /// Path relative to the deployment directory.
  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  pub fn state_path(&self) -> PathBuf {
    self.path("results.json")
  }

  pub fn read_json(&self, relative_path: &str) -> serde_json::Value {
    let content = std::fs::read_to_string(self.path(relative_path)).unwrap();
    serde_json::from_str(&content).unwrap()
  }

  /// Get a pre-configured Command for the ironstep binary.
  ///
  /// Runs in the deployment directory with an explicit `-c`, and clears the
  /// environment overrides so the host shell cannot leak in.
  pub fn ironstep_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("ironstep");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("IRONSTEP_CONFIG");
    cmd.env_remove("IRONSTEP_STATE");
    cmd.env_remove("RUST_LOG");
    cmd.arg("-c").arg(&self.config_path);
    cmd
  }

  /// Run `ironstep deploy` and require success.
  pub fn deploy(&self) {
    self.ironstep_cmd().arg("deploy").assert().success();
  }
}
