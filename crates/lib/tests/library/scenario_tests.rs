use std::fs;

use ironstep_lib::execute::{ExecuteError, Orchestrator, RunReport};
use ironstep_lib::ledger::{Address, SimulatedLedger};
use ironstep_lib::lifecycle::{Exit, LifecycleGuard, RunOutcome, ShutdownSignal};
use ironstep_lib::step::{AttachPolicy, StepError, export, render_script};
use ironstep_lib::store::{JsonFileStorage, StepKey, StepRecord};
use tokio::sync::oneshot;

use super::common::{GatedLedger, RESOURCES, TASKS, protocol, temp_state};

fn never() -> impl Future<Output = ShutdownSignal> {
  std::future::pending()
}

async fn deploy(
  orchestrator: &Orchestrator<'_, SimulatedLedger>,
  storage: JsonFileStorage,
) -> RunOutcome<RunReport, ExecuteError> {
  LifecycleGuard::open(storage)
    .unwrap()
    .run(never(), async |record: &mut StepRecord| orchestrator.run(record).await)
    .await
}

fn report(outcome: RunOutcome<RunReport, ExecuteError>) -> RunReport {
  assert!(outcome.flush.is_ok());
  match outcome.exit {
    Exit::Completed(report) => report,
    Exit::Failed(err) => panic!("run failed: {}", err),
    Exit::Interrupted(signal) => panic!("run interrupted by {}", signal),
  }
}

fn recorded_address(record: &StepRecord, name: &str) -> Address {
  Address::parse(record.get(&StepKey::resource(name)).unwrap()).unwrap()
}

#[tokio::test]
async fn fresh_run_then_rerun_is_a_no_op() {
  let (_temp, path) = temp_state();
  let ledger = SimulatedLedger::new();
  let orchestrator = Orchestrator::new(protocol(), &ledger);

  let first = report(deploy(&orchestrator, JsonFileStorage::new(&path)).await);

  assert_eq!(first.deployed, RESOURCES);
  assert_eq!(first.executed.len(), TASKS);
  assert_eq!(ledger.deploy_count(), RESOURCES.len());

  let record = StepRecord::load(&path).unwrap();
  assert_eq!(record.len(), RESOURCES.len() * 2 + TASKS);
  for name in RESOURCES {
    assert!(record.contains(&StepKey::verify(name)), "missing verify-{}", name);
  }
  let persisted = fs::read_to_string(&path).unwrap();

  let second = report(deploy(&orchestrator, JsonFileStorage::new(&path)).await);

  assert_eq!(second.transactions(), 0);
  assert_eq!(second.attached, RESOURCES);
  assert_eq!(second.skipped.len(), TASKS);
  assert_eq!(ledger.deploy_count(), RESOURCES.len());
  assert_eq!(ledger.send_count(), TASKS);
  assert_eq!(fs::read_to_string(&path).unwrap(), persisted);
}

#[tokio::test]
async fn vanished_treasury_redeploys_its_dependents() {
  let (_temp, path) = temp_state();
  let ledger = SimulatedLedger::new();
  let orchestrator = Orchestrator::new(protocol(), &ledger);
  report(deploy(&orchestrator, JsonFileStorage::new(&path)).await);

  let before = StepRecord::load(&path).unwrap();
  let old_treasury = recorded_address(&before, "Treasury");
  assert!(ledger.remove_contract(&old_treasury));

  let run = report(deploy(&orchestrator, JsonFileStorage::new(&path)).await);

  assert_eq!(run.redeployed, vec!["Treasury"]);
  assert_eq!(
    run.deployed,
    vec!["Treasury", "Dollar", "Share", "PoolBUSD", "DollarOracle", "ShareOracle"]
  );
  assert_eq!(
    run.attached,
    vec![
      "MockBUSD",
      "Timelock",
      "PairOracle_DOLLAR_BUSD",
      "PairOracle_SHARE_BNB",
      "MockChainlinkAggregator_BUSD_USD",
      "MockChainlinkAggregator_BNB_USD",
      "BusdOracle",
    ]
  );
  assert_eq!(run.executed.len(), TASKS);

  let after = StepRecord::load(&path).unwrap();
  let new_treasury = recorded_address(&after, "Treasury");
  assert_ne!(new_treasury, old_treasury);

  // The new Dollar was built against the new treasury.
  let dollar_args = ledger.constructor_args(&recorded_address(&after, "Dollar")).unwrap();
  assert_eq!(dollar_args[2].to_string(), new_treasury.to_string());

  // Unrelated entries are untouched; verification arguments are write-once.
  assert_eq!(
    after.get(&StepKey::resource("MockBUSD")),
    before.get(&StepKey::resource("MockBUSD"))
  );
  assert_eq!(
    after.get(&StepKey::verify("Dollar")),
    before.get(&StepKey::verify("Dollar"))
  );
}

#[tokio::test]
async fn termination_mid_deploy_flushes_completed_steps_and_resumes() {
  let (_temp, path) = temp_state();
  let chain = SimulatedLedger::new();
  let (reached_tx, reached_rx) = oneshot::channel();
  let gated = GatedLedger::new(&chain, 4, reached_tx);

  let interrupted = {
    let orchestrator = Orchestrator::new(protocol(), &gated);
    let shutdown = async {
      let _ = reached_rx.await;
      ShutdownSignal::Terminate
    };
    LifecycleGuard::open(JsonFileStorage::new(&path))
      .unwrap()
      .run(shutdown, async |record: &mut StepRecord| orchestrator.run(record).await)
      .await
  };

  assert!(matches!(interrupted.exit, Exit::Interrupted(ShutdownSignal::Terminate)));
  assert!(interrupted.flush.is_ok());
  assert_eq!(interrupted.exit_code(), 1);

  // Dollar landed on chain but was never recorded.
  assert_eq!(chain.contract_count(), 4);
  let record = StepRecord::load(&path).unwrap();
  let resources: Vec<String> = record
    .iter()
    .filter_map(|(key, _)| match key {
      StepKey::Resource(name) => Some(name),
      _ => None,
    })
    .collect();
  assert_eq!(resources.len(), 3);
  for name in ["MockBUSD", "Timelock", "Treasury"] {
    assert!(resources.iter().any(|r| r == name), "{} not recorded", name);
  }
  assert!(!record.contains(&StepKey::resource("Dollar")));

  let orchestrator = Orchestrator::new(protocol(), &chain);
  let resumed = report(deploy(&orchestrator, JsonFileStorage::new(&path)).await);

  assert_eq!(resumed.attached, vec!["MockBUSD", "Timelock", "Treasury"]);
  assert_eq!(resumed.deployed.first().map(String::as_str), Some("Dollar"));
  assert_eq!(resumed.deployed.len(), RESOURCES.len() - 3);
  assert_eq!(resumed.executed.len(), TASKS);
  // The orphaned Dollar from the interrupted run stays on chain.
  assert_eq!(chain.contract_count(), RESOURCES.len() + 1);
}

#[tokio::test]
async fn failed_step_keeps_progress_for_next_run() {
  let (_temp, path) = temp_state();
  let ledger = SimulatedLedger::new();
  ledger.fail_deploys_of("Pool");
  let orchestrator = Orchestrator::new(protocol(), &ledger);

  let failed = deploy(&orchestrator, JsonFileStorage::new(&path)).await;

  assert!(matches!(
    failed.exit,
    Exit::Failed(ExecuteError::Step(StepError::Execution { ref step, .. })) if step == "PoolBUSD"
  ));
  assert!(failed.flush.is_ok());
  assert_eq!(failed.exit_code(), 1);
  let record = StepRecord::load(&path).unwrap();
  assert!(record.contains(&StepKey::resource("Share")));
  assert!(!record.contains(&StepKey::resource("PoolBUSD")));

  ledger.clear_faults();
  let resumed = report(deploy(&orchestrator, JsonFileStorage::new(&path)).await);
  assert_eq!(resumed.attached, &RESOURCES[..5]);
  assert_eq!(resumed.deployed, &RESOURCES[5..]);
}

#[tokio::test]
async fn unreachable_ledger_aborts_under_strict_policy() {
  let (_temp, path) = temp_state();
  let ledger = SimulatedLedger::new();
  let orchestrator = Orchestrator::new(protocol(), &ledger);
  report(deploy(&orchestrator, JsonFileStorage::new(&path)).await);
  let persisted = fs::read_to_string(&path).unwrap();

  ledger.set_unreachable(true);
  let outcome = deploy(&orchestrator, JsonFileStorage::new(&path)).await;

  assert!(matches!(
    outcome.exit,
    Exit::Failed(ExecuteError::Step(StepError::AmbiguousAttach { ref name, .. })) if name == "MockBUSD"
  ));
  assert_eq!(ledger.deploy_count(), RESOURCES.len());
  assert_eq!(fs::read_to_string(&path).unwrap(), persisted);
}

#[tokio::test]
async fn unreachable_ledger_redeploys_under_redeploy_policy() {
  let (_temp, path) = temp_state();
  let ledger = SimulatedLedger::new();
  report(deploy(&Orchestrator::new(protocol(), &ledger), JsonFileStorage::new(&path)).await);

  ledger.set_unreachable(true);
  let orchestrator = Orchestrator::new(protocol(), &ledger).with_policy(AttachPolicy::Redeploy);
  let run = report(deploy(&orchestrator, JsonFileStorage::new(&path)).await);

  assert_eq!(run.deployed, RESOURCES);
  assert_eq!(ledger.deploy_count(), RESOURCES.len() * 2);
}

#[tokio::test]
async fn verification_script_covers_every_resource() {
  let (_temp, path) = temp_state();
  let ledger = SimulatedLedger::new();
  report(deploy(&Orchestrator::new(protocol(), &ledger), JsonFileStorage::new(&path)).await);

  let record = StepRecord::load(&path).unwrap();
  let entries = export(&record).unwrap();
  let script = render_script(&entries, "bsc");

  assert_eq!(entries.len(), RESOURCES.len());
  assert!(script.starts_with("#!/usr/bin/env sh\n\n"));
  let treasury = record.get(&StepKey::resource("Treasury")).unwrap();
  assert!(script.contains(&format!("# verify Treasury\nnpx hardhat verify --network bsc {}\n", treasury)));
  let mock = record.get(&StepKey::resource("MockBUSD")).unwrap();
  assert!(script.contains(&format!(
    "npx hardhat verify --network bsc {} '0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266' '100000000000000000000000000' 'BUSD' '18'",
    mock
  )));
}
