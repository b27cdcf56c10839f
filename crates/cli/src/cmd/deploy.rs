//! Implementation of the `ironstep deploy` command.
//!
//! Locks the state file, runs the protocol plan under the lifecycle guard and
//! prints a summary. The record is flushed exactly once however the run ends.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use ironstep_lib::config::LedgerConfig;
use ironstep_lib::execute::{Orchestrator, RunReport};
use ironstep_lib::lifecycle::{Exit, LifecycleGuard, shutdown_signal};
use ironstep_lib::store::{JsonFileStorage, StepRecord};
use ironstep_lib::store_lock::{LockMode, StoreLock};

use super::{Workspace, runtime};
use crate::output::{format_duration, print_error, print_info, print_stat, print_success, print_warning};

/// Execute the deploy command.
///
/// Returns exit code 0 only when every step completed and the state file was written.
pub fn cmd_deploy(workspace: &Workspace) -> Result<ExitCode> {
  let config = workspace.load_config()?;
  let plan = workspace.plan(&config)?;
  let state = workspace.state_path(&config);

  let _lock = StoreLock::acquire(&state, LockMode::Exclusive, "deploy").context("Failed to lock state file")?;

  let ledger = workspace.open_ledger(&config)?;
  if matches!(config.ledger, LedgerConfig::Simulated { chain_state: None }) {
    print_warning("Simulated ledger has no chain_state; deployed contracts vanish when this process exits");
  }

  let guard = LifecycleGuard::open(JsonFileStorage::new(&state)).context("Failed to load state file")?;
  let orchestrator = Orchestrator::new(plan, ledger.as_ref()).with_policy(config.attach_policy);

  print_info(&format!(
    "Deploying {} step(s) on {} ({} ledger, {} recorded)",
    orchestrator.plan().len(),
    config.network,
    ledger.name(),
    guard.record().len()
  ));

  let started = Instant::now();
  let rt = runtime()?;
  let outcome = rt.block_on(guard.run(shutdown_signal(), async |record: &mut StepRecord| {
    orchestrator.run(record).await
  }));
  info!(elapsed = ?started.elapsed(), code = outcome.exit_code(), "deploy finished");

  match &outcome.exit {
    Exit::Completed(report) => {
      print_success(&format!("Deployment complete in {}", format_duration(started.elapsed())));
      print_report(report, workspace.verbose());
    }
    Exit::Failed(err) => print_error(&format!("Deployment failed: {}", err)),
    Exit::Interrupted(signal) => print_warning(&format!("Deployment interrupted by {}", signal)),
  }

  match &outcome.flush {
    Ok(()) => print_stat("State", &state.display().to_string()),
    Err(err) => print_error(&format!("Failed to save state, progress from this run is lost: {}", err)),
  }

  Ok(ExitCode::from(outcome.exit_code()))
}

fn print_report(report: &RunReport, verbose: bool) {
  let sections: [(&str, &[String]); 6] = [
    ("Deployed", &report.deployed),
    ("Redeployed", &report.redeployed),
    ("Attached", &report.attached),
    ("Executed", &report.executed),
    ("Skipped", &report.skipped),
    ("Invalidated", &report.invalidated),
  ];

  for (label, names) in sections {
    if verbose && !names.is_empty() {
      print_stat(label, &names.join(", "));
    } else {
      print_stat(label, &names.len().to_string());
    }
  }
  print_stat("Transactions", &report.transactions().to_string());
}
