use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ironstep_lib::config::DeployConfig;
use ironstep_lib::ledger::{
  Address, Arg, AttachError, ContractHandle, ContractKind, Deployment, LedgerError, Receipt, RemoteLedger,
  SimulatedLedger,
};
use ironstep_lib::plan::{Plan, protocol_plan};
use tempfile::TempDir;
use tokio::sync::oneshot;

pub const CONFIG: &str = r#"
deployer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"

[collateral]
symbol = "BUSD"

[share]
dev_fund = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
vesting_start = "2021-02-25T09:00:00Z"
"#;

/// Resources in the default protocol plan, in order.
pub const RESOURCES: [&str; 13] = [
  "MockBUSD",
  "Timelock",
  "Treasury",
  "Dollar",
  "Share",
  "PoolBUSD",
  "PairOracle_DOLLAR_BUSD",
  "PairOracle_SHARE_BNB",
  "MockChainlinkAggregator_BUSD_USD",
  "MockChainlinkAggregator_BNB_USD",
  "BusdOracle",
  "DollarOracle",
  "ShareOracle",
];

pub const TASKS: usize = 6;

pub fn protocol() -> Plan {
  protocol_plan(&DeployConfig::from_toml(CONFIG).unwrap()).unwrap()
}

pub fn temp_state() -> (TempDir, PathBuf) {
  let temp = TempDir::new().unwrap();
  let path = temp.path().join("results.json");
  (temp, path)
}

/// Forwards to a simulated ledger, but the `stop_at`-th deployment never
/// confirms: it lands on the chain, fires `reached`, then hangs.
pub struct GatedLedger<'a> {
  inner: &'a SimulatedLedger,
  stop_at: usize,
  deploys: AtomicUsize,
  reached: Mutex<Option<oneshot::Sender<()>>>,
}

impl<'a> GatedLedger<'a> {
  pub fn new(inner: &'a SimulatedLedger, stop_at: usize, reached: oneshot::Sender<()>) -> Self {
    Self {
      inner,
      stop_at,
      deploys: AtomicUsize::new(0),
      reached: Mutex::new(Some(reached)),
    }
  }
}

#[async_trait]
impl RemoteLedger for GatedLedger<'_> {
  fn name(&self) -> &str {
    "gated"
  }

  async fn deploy(&self, kind: &ContractKind, args: &[Arg]) -> Result<Deployment, LedgerError> {
    let deployment = self.inner.deploy(kind, args).await?;
    if self.deploys.fetch_add(1, Ordering::SeqCst) + 1 == self.stop_at {
      let sender = self.reached.lock().unwrap().take();
      if let Some(sender) = sender {
        let _ = sender.send(());
      }
      std::future::pending::<()>().await;
    }
    Ok(deployment)
  }

  async fn attach(&self, kind: &ContractKind, address: &Address) -> Result<ContractHandle, AttachError> {
    self.inner.attach(kind, address).await
  }

  async fn call(&self, handle: &ContractHandle, method: &str, args: &[Arg]) -> Result<serde_json::Value, LedgerError> {
    self.inner.call(handle, method, args).await
  }

  async fn send(&self, handle: &ContractHandle, method: &str, args: &[Arg]) -> Result<Receipt, LedgerError> {
    self.inner.send(handle, method, args).await
  }
}
