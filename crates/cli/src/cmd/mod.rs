mod call;
mod deploy;
mod init;
mod plan;
mod status;
mod verify;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use ironstep_lib::config::{DeployConfig, LedgerConfig};
use ironstep_lib::ledger::{CommandLedger, RemoteLedger, SimulatedLedger};
use ironstep_lib::plan::{Plan, protocol_plan};
use ironstep_lib::platform::paths;
use ironstep_lib::store::StepRecord;
use ironstep_lib::store_lock::{LockMode, StoreLock};

pub use call::cmd_call;
pub use deploy::cmd_deploy;
pub use init::cmd_init;
pub use plan::cmd_plan;
pub use status::cmd_status;
pub use verify::cmd_verify;

/// Paths and flags shared by every command.
pub struct Workspace {
  config_path: PathBuf,
  state_override: Option<PathBuf>,
  verbose: bool,
}

impl Workspace {
  pub fn new(config: Option<PathBuf>, state: Option<PathBuf>, verbose: bool) -> Self {
    Self {
      config_path: paths::config_path(config.as_deref()),
      state_override: state,
      verbose,
    }
  }

  pub fn config_path(&self) -> &Path {
    &self.config_path
  }

  pub fn verbose(&self) -> bool {
    self.verbose
  }

  pub fn load_config(&self) -> Result<DeployConfig> {
    let config = DeployConfig::from_file(&self.config_path)
      .with_context(|| format!("Failed to load config: {}", self.config_path.display()))?;
    debug!(path = %self.config_path.display(), network = %config.network, "config loaded");
    Ok(config)
  }

  pub fn plan(&self, config: &DeployConfig) -> Result<Plan> {
    protocol_plan(config).context("Invalid protocol plan")
  }

  pub fn state_path(&self, config: &DeployConfig) -> PathBuf {
    paths::state_path(
      self.state_override.as_deref(),
      config.state_file.as_deref(),
      &self.config_path,
    )
  }

  /// Load the record under a shared lock, for read-only commands.
  pub fn read_record(&self, config: &DeployConfig) -> Result<(PathBuf, StepRecord)> {
    let state = self.state_path(config);
    let _lock = StoreLock::acquire(&state, LockMode::Shared, "read").context("Failed to lock state file")?;
    let record = StepRecord::load(&state).context("Failed to load state file")?;
    Ok((state, record))
  }

  pub fn open_ledger(&self, config: &DeployConfig) -> Result<Box<dyn RemoteLedger>> {
    match &config.ledger {
      LedgerConfig::Simulated { chain_state: Some(chain_state) } => {
        let path = paths::relative_to(&paths::config_dir(&self.config_path), chain_state);
        let ledger = SimulatedLedger::open(&path)
          .with_context(|| format!("Failed to open simulated chain: {}", path.display()))?;
        Ok(Box::new(ledger))
      }
      LedgerConfig::Simulated { chain_state: None } => Ok(Box::new(SimulatedLedger::new())),
      LedgerConfig::Command { program, args } => Ok(Box::new(CommandLedger::new(program.clone(), args.clone()))),
    }
  }
}

/// Create the async runtime a command drives the ledger on.
fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
