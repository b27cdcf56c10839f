//! Implementation of the `ironstep plan` command.
//!
//! Previews a deploy against the current state file. Recorded addresses are
//! checked with read-only attach calls; nothing is submitted and the record is
//! not written.

use anyhow::Result;
use serde::Serialize;

use ironstep_lib::execute::{Orchestrator, PlannedAction, PlannedStep};

use super::{Workspace, runtime};
use crate::output::{print_info, print_json, print_planned, print_success};

#[derive(Serialize)]
struct PlanOutput<'a> {
  network: &'a str,
  state_file: String,
  steps: &'a [PlannedStep],
}

pub fn cmd_plan(workspace: &Workspace, json: bool) -> Result<()> {
  let config = workspace.load_config()?;
  let plan = workspace.plan(&config)?;
  let (state, record) = workspace.read_record(&config)?;
  let ledger = workspace.open_ledger(&config)?;

  let orchestrator = Orchestrator::new(plan, ledger.as_ref()).with_policy(config.attach_policy);
  let planned = runtime()?.block_on(orchestrator.preview(&record));

  if json {
    return print_json(&PlanOutput {
      network: &config.network,
      state_file: state.display().to_string(),
      steps: &planned,
    });
  }

  print_info(&format!("Plan for {} ({} step(s))", config.network, planned.len()));
  for step in &planned {
    print_planned(step.action, &step.name, step.reason.as_deref());
  }
  println!();

  let count = |action: PlannedAction| planned.iter().filter(|p| p.action == action).count();
  let deploys = count(PlannedAction::Deploy) + count(PlannedAction::Redeploy);
  let executes = count(PlannedAction::Execute);
  if deploys + executes == 0 {
    print_success("Nothing to do; every step is recorded and live");
  } else {
    print_info(&format!(
      "Would deploy {} contract(s) and execute {} task(s)",
      deploys, executes
    ));
  }

  Ok(())
}
