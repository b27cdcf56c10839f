//! Plan execution.
//!
//! The [`Orchestrator`] walks a [`Plan`] top to bottom, one step at a time.
//! Each step is idempotent against the record, so re-running after a failure
//! resumes at the first step without a recorded completion.
//!
//! When a resource has to be deployed fresh, or a configured external address
//! differs from the one pinned by the previous run, every step downstream of
//! it in the plan loses its record entry on the spot: those steps were
//! configured against the old address and must run again. Verification
//! entries are left alone.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::ledger::{Address, Arg, ContractHandle, ContractKind, RemoteLedger};
use crate::plan::{ArgSource, Plan, Step};
use crate::step::{AttachPolicy, Origin, StepError, Steps, TaskOutcome};
use crate::store::StepRecord;

#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error(transparent)]
  Step(#[from] StepError),

  /// A step needs an address that was never resolved in this run.
  #[error("step {step} needs the address of {reference}, which is not resolved")]
  Unresolved { step: String, reference: String },
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
  /// Resources deployed in this run, replacements included.
  pub deployed: Vec<String>,
  /// Subset of `deployed` that replaced a stale recorded address.
  pub redeployed: Vec<String>,
  pub attached: Vec<String>,
  pub external: Vec<String>,
  pub executed: Vec<String>,
  pub skipped: Vec<String>,
  /// Record keys dropped because an upstream resource was redeployed.
  pub invalidated: Vec<String>,
}

impl RunReport {
  /// Transactions submitted: deployments plus executed tasks.
  pub fn transactions(&self) -> usize {
    self.deployed.len() + self.executed.len()
  }
}

/// What a run would do to a step, given the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
  Attach,
  Deploy,
  Redeploy,
  Execute,
  Skip,
  External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
  pub name: String,
  pub action: PlannedAction,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
}

impl PlannedStep {
  fn new(name: &str, action: PlannedAction) -> Self {
    Self {
      name: name.to_string(),
      action,
      reason: None,
    }
  }

  fn because(mut self, reason: impl Into<String>) -> Self {
    self.reason = Some(reason.into());
    self
  }
}

/// Drives a [`Plan`] against a ledger.
pub struct Orchestrator<'l, L: RemoteLedger + ?Sized> {
  plan: Plan,
  ledger: &'l L,
  policy: AttachPolicy,
}

impl<'l, L: RemoteLedger + ?Sized> Orchestrator<'l, L> {
  pub fn new(plan: Plan, ledger: &'l L) -> Self {
    Self {
      plan,
      ledger,
      policy: AttachPolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: AttachPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn plan(&self) -> &Plan {
    &self.plan
  }

  /// Run every step in order, stopping at the first failure.
  ///
  /// Completed steps are in `record` whether or not this returns `Ok`.
  pub async fn run(&self, record: &mut StepRecord) -> Result<RunReport, ExecuteError> {
    let mut report = RunReport::default();
    let mut resolved: HashMap<String, ContractHandle> = HashMap::new();
    let mut steps = Steps::new(record, self.ledger).with_policy(self.policy);

    info!(steps = self.plan.len(), ledger = self.ledger.name(), "run started");

    for step in self.plan.steps() {
      match step {
        Step::External { name, kind, address } => {
          let (handle, previous) = steps.external(name, kind, address).await?;
          if previous.is_some() {
            self.invalidate_downstream(&mut steps, name, &mut report);
          }
          resolved.insert(name.clone(), handle);
          report.external.push(name.clone());
        }

        Step::Resource { name, kind, args } => {
          let args = resolve_args(name, args, &resolved)?;
          let (handle, origin) = steps.resource(name, kind, &args).await?;
          match origin {
            Origin::Attached => report.attached.push(name.clone()),
            Origin::Deployed { replaced } => {
              report.deployed.push(name.clone());
              if replaced.is_some() {
                report.redeployed.push(name.clone());
              }
              self.invalidate_downstream(&mut steps, name, &mut report);
            }
          }
          resolved.insert(name.clone(), handle);
        }

        Step::Task {
          name,
          target,
          method,
          args,
        } => {
          let handle = resolved.get(target).cloned().ok_or_else(|| ExecuteError::Unresolved {
            step: name.clone(),
            reference: target.clone(),
          })?;
          let args = resolve_args(name, args, &resolved)?;
          let ledger = self.ledger;
          let run = steps
            .run_once(name, move || async move {
              ledger.send(&handle, method, &args).await.map(TaskOutcome::from)
            })
            .await?;
          if run.executed {
            report.executed.push(name.clone());
          } else {
            report.skipped.push(name.clone());
          }
        }
      }
    }

    info!(
      deployed = report.deployed.len(),
      attached = report.attached.len(),
      executed = report.executed.len(),
      skipped = report.skipped.len(),
      "run complete"
    );
    Ok(report)
  }

  fn invalidate_downstream(&self, steps: &mut Steps<'_, L>, name: &str, report: &mut RunReport) {
    for dependent in self.plan.downstream(name) {
      let key = dependent.key();
      if steps.forget(&key).is_some() {
        warn!(step = dependent.name(), upstream = name, "invalidated by upstream address change");
        report.invalidated.push(key.to_string());
      }
    }
  }

  /// Report what [`Orchestrator::run`] would do, without submitting anything.
  ///
  /// Recorded addresses are checked with read-only attach calls.
  pub async fn preview(&self, record: &StepRecord) -> Vec<PlannedStep> {
    let mut changing: HashSet<&str> = HashSet::new();
    let mut planned = Vec::with_capacity(self.plan.len());

    for step in self.plan.steps() {
      let name = step.name();
      let changed_upstream = step.dependencies().into_iter().find(|d| changing.contains(d));
      let recorded = record.get(&step.key()).map(str::to_string);

      let entry = match step {
        Step::External { kind, address, .. } => match self.ledger.attach(kind, address).await {
          Err(e) => PlannedStep::new(name, PlannedAction::External).because(format!("does not resolve: {}", e)),
          Ok(_) => match recorded {
            Some(pinned) if pinned != address.to_string() => {
              changing.insert(name);
              PlannedStep::new(name, PlannedAction::External).because(format!("address changed from {}", pinned))
            }
            _ => PlannedStep::new(name, PlannedAction::External),
          },
        },

        Step::Resource { kind, .. } => match (recorded, changed_upstream) {
          (None, _) => PlannedStep::new(name, PlannedAction::Deploy),
          (Some(_), Some(upstream)) => {
            PlannedStep::new(name, PlannedAction::Redeploy).because(format!("{} will change", upstream))
          }
          (Some(raw), None) => self.preview_attach(name, kind, &raw).await,
        },

        Step::Task { .. } => match (recorded, changed_upstream) {
          (_, Some(upstream)) => {
            PlannedStep::new(name, PlannedAction::Execute).because(format!("{} will change", upstream))
          }
          (Some(_), None) => PlannedStep::new(name, PlannedAction::Skip),
          (None, None) => PlannedStep::new(name, PlannedAction::Execute),
        },
      };

      if matches!(entry.action, PlannedAction::Deploy | PlannedAction::Redeploy) {
        changing.insert(name);
      }
      planned.push(entry);
    }

    planned
  }

  async fn preview_attach(&self, name: &str, kind: &ContractKind, raw: &str) -> PlannedStep {
    let address = match Address::parse(raw) {
      Ok(address) => address,
      Err(e) => return PlannedStep::new(name, PlannedAction::Redeploy).because(e.to_string()),
    };
    match self.ledger.attach(kind, &address).await {
      Ok(_) => PlannedStep::new(name, PlannedAction::Attach),
      Err(e) if e.is_definitive() || self.policy == AttachPolicy::Redeploy => {
        PlannedStep::new(name, PlannedAction::Redeploy).because(e.to_string())
      }
      Err(e) => PlannedStep::new(name, PlannedAction::Attach).because(format!("unconfirmed, run would abort: {}", e)),
    }
  }
}

fn resolve_args(
  step: &str,
  args: &[ArgSource],
  resolved: &HashMap<String, ContractHandle>,
) -> Result<Vec<Arg>, ExecuteError> {
  args
    .iter()
    .map(|source| match source {
      ArgSource::Literal(arg) => Ok(arg.clone()),
      ArgSource::AddressOf(reference) => resolved
        .get(reference)
        .map(|handle| Arg::Address(handle.address.clone()))
        .ok_or_else(|| ExecuteError::Unresolved {
          step: step.to_string(),
          reference: reference.clone(),
        }),
    })
    .collect()
}
