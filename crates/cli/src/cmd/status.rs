//! Status command implementation.
//!
//! Lists what the state file records: resource addresses, completed tasks and
//! verification arguments. Entries the current plan no longer produces are
//! flagged.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use ironstep_lib::plan::Plan;
use ironstep_lib::step::{TaskOutcome, VerifyArgs};
use ironstep_lib::store::{StepKey, StepRecord};

use super::Workspace;
use crate::output::{self, print_info, print_json, print_stat, print_success, print_warning, truncate_hash};

#[derive(Debug, Default, Serialize)]
struct StatusOutput {
  state_file: String,
  resources: BTreeMap<String, String>,
  tasks: BTreeMap<String, serde_json::Value>,
  verify: BTreeMap<String, Vec<String>>,
  /// Record keys the current plan does not produce.
  unknown: Vec<String>,
}

pub fn cmd_status(workspace: &Workspace, json: bool) -> Result<()> {
  let config = workspace.load_config()?;
  let plan = workspace.plan(&config)?;
  let (state, record) = workspace.read_record(&config)?;

  let status = collect(&plan, &record, state.display().to_string());

  if json {
    return print_json(&status);
  }

  if record.is_empty() {
    print_info(&format!(
      "No recorded steps in {}. Run 'ironstep deploy' to start.",
      status.state_file
    ));
    return Ok(());
  }

  print_success(&format!("State: {}", status.state_file));
  print_stat("Resources", &status.resources.len().to_string());
  print_stat("Tasks", &status.tasks.len().to_string());
  print_stat("Verification entries", &status.verify.len().to_string());

  if !status.resources.is_empty() {
    println!();
    println!("Resources:");
    for (name, address) in &status.resources {
      println!("  {} {} {}", output::symbols::INFO, name, address);
    }
  }

  if !status.tasks.is_empty() {
    println!();
    println!("Tasks:");
    for (name, outcome) in &status.tasks {
      if workspace.verbose() {
        println!("  {} {} {}", output::symbols::INFO, name, outcome);
      } else if let Some(hash) = outcome.get("tx_hash").and_then(|h| h.as_str()) {
        println!("  {} {} (tx {})", output::symbols::INFO, name, truncate_hash(hash));
      } else {
        println!("  {} {}", output::symbols::INFO, name);
      }
    }
  }

  if workspace.verbose() && !status.verify.is_empty() {
    println!();
    println!("Verification:");
    for (name, args) in &status.verify {
      println!("  {} {} [{}]", output::symbols::INFO, name, args.join(", "));
    }
  }

  if !status.unknown.is_empty() {
    println!();
    print_warning(&format!(
      "{} recorded entr(ies) not produced by the current plan: {}",
      status.unknown.len(),
      status.unknown.join(", ")
    ));
  }

  Ok(())
}

fn collect(plan: &Plan, record: &StepRecord, state_file: String) -> StatusOutput {
  let mut status = StatusOutput {
    state_file,
    ..StatusOutput::default()
  };

  for (key, raw) in record.iter() {
    let known = plan.get(key.name()).is_some_and(|step| step.key() == key)
      || matches!(&key, StepKey::Verify(name) if plan.get(name).is_some());
    if !known {
      status.unknown.push(key.to_string());
    }

    match key {
      StepKey::Resource(name) => {
        status.resources.insert(name, raw.to_string());
      }
      StepKey::Task(name) => {
        let value = match TaskOutcome::decode(raw) {
          Ok(outcome) => serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null),
          Err(_) => serde_json::Value::String(raw.to_string()),
        };
        status.tasks.insert(name, value);
      }
      StepKey::Verify(name) => {
        let args = VerifyArgs::decode(raw).map(|a| a.0).unwrap_or_else(|_| vec![raw.to_string()]);
        status.verify.insert(name, args);
      }
    }
  }

  status
}
