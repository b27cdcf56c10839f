//! Implementation of the `ironstep call` command.

use anyhow::{Context, Result, bail};

use ironstep_lib::ledger::{Address, Arg};
use ironstep_lib::plan::Step;
use ironstep_lib::store::StepKey;

use super::{Workspace, runtime};
use crate::output::print_json;

/// Attach to a recorded resource and print the JSON result of `method(args)`.
///
/// Read-only: never submits a transaction and never writes the record.
pub fn cmd_call(workspace: &Workspace, resource: &str, method: &str, args: &[String]) -> Result<()> {
  let config = workspace.load_config()?;
  let plan = workspace.plan(&config)?;
  let (_state, record) = workspace.read_record(&config)?;

  let (kind, address) = match plan.get(resource) {
    Some(Step::Resource { kind, .. }) => {
      let Some(raw) = record.get(&StepKey::resource(resource)) else {
        bail!("{} has not been deployed yet", resource);
      };
      let address = Address::parse(raw).with_context(|| format!("Recorded address of {} is invalid", resource))?;
      (kind.clone(), address)
    }
    Some(Step::External { kind, address, .. }) => (kind.clone(), address.clone()),
    Some(Step::Task { .. }) => bail!("{} is a task, not a contract", resource),
    None => bail!("{} is not part of the protocol plan", resource),
  };

  let args: Vec<Arg> = args.iter().map(|a| Arg::guess(a)).collect();
  let ledger = workspace.open_ledger(&config)?;

  let value = runtime()?.block_on(async {
    let handle = ledger
      .attach(&kind, &address)
      .await
      .with_context(|| format!("Failed to attach to {} at {}", resource, address))?;
    ledger
      .call(&handle, method, &args)
      .await
      .with_context(|| format!("{}.{} failed", resource, method))
  })?;

  print_json(&value)
}
