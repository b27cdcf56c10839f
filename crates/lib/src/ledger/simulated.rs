//! In-process simulated ledger.
//!
//! Deploys are instant and addresses are derived deterministically from a
//! nonce, so two runs against fresh simulators produce the same topology.
//! When opened with a chain-state path the simulated chain survives process
//! restarts, which lets the CLI demonstrate resumption without a network.
//!
//! Fault injection hooks (`fail_deploys_of`, `fail_sends_of`,
//! `set_unreachable`, `remove_contract`) drive the failure paths in tests.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{
  Address, Arg, AttachError, ContractHandle, ContractKind, Deployment, LedgerError, Receipt, RemoteLedger,
};

const ADDRESS_DOMAIN: &[u8] = b"ironstep-simulated:address:";
const TX_DOMAIN: &[u8] = b"ironstep-simulated:tx:";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimContract {
  kind: ContractKind,
  address: Address,
  constructor_args: Vec<Arg>,
  /// Arguments of the most recent send, per method name.
  #[serde(default)]
  storage: BTreeMap<String, Vec<Arg>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChainState {
  nonce: u64,
  block_number: u64,
  /// Keyed by lowercase address.
  contracts: BTreeMap<String, SimContract>,
}

impl ChainState {
  fn next_tx(&mut self) -> (u64, String) {
    self.nonce += 1;
    self.block_number += 1;
    let tx_hash = format!("0x{}", hex::encode(digest(TX_DOMAIN, self.nonce)));
    (self.block_number, tx_hash)
  }

  fn contract(&self, address: &Address) -> Option<&SimContract> {
    self.contracts.get(&address.as_str().to_ascii_lowercase())
  }

  fn contract_mut(&mut self, address: &Address) -> Option<&mut SimContract> {
    self.contracts.get_mut(&address.as_str().to_ascii_lowercase())
  }
}

fn digest(domain: &[u8], nonce: u64) -> [u8; 32] {
  let mut hasher = Sha256::new();
  hasher.update(domain);
  hasher.update(nonce.to_be_bytes());
  hasher.finalize().into()
}

#[derive(Debug, Default)]
struct Faults {
  deploy_kinds: HashSet<String>,
  send_methods: HashSet<String>,
  unreachable: bool,
}

#[derive(Debug, Default)]
struct Counters {
  deploys: usize,
  sends: usize,
  sent: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
  chain: ChainState,
  faults: Faults,
  counters: Counters,
}

/// A ledger that lives in memory, optionally mirrored to a JSON file.
#[derive(Debug, Default)]
pub struct SimulatedLedger {
  inner: Mutex<Inner>,
  chain_path: Option<PathBuf>,
}

impl SimulatedLedger {
  /// A fresh, empty, memory-only chain.
  pub fn new() -> Self {
    Self::default()
  }

  /// Open a chain persisted at `path`, creating it on first write.
  pub fn open(path: &Path) -> Result<Self, LedgerError> {
    let chain = match fs::read_to_string(path) {
      Ok(content) if content.trim().is_empty() => ChainState::default(),
      Ok(content) => serde_json::from_str(&content).map_err(|e| LedgerError::Malformed {
        message: format!("chain state {}: {}", path.display(), e),
      })?,
      Err(e) if e.kind() == io::ErrorKind::NotFound => ChainState::default(),
      Err(e) => {
        return Err(LedgerError::Transport {
          message: format!("failed to read chain state {}: {}", path.display(), e),
        });
      }
    };

    debug!(path = %path.display(), contracts = chain.contracts.len(), "simulated chain opened");
    Ok(Self {
      inner: Mutex::new(Inner {
        chain,
        ..Inner::default()
      }),
      chain_path: Some(path.to_path_buf()),
    })
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn save(&self, chain: &ChainState) -> Result<(), LedgerError> {
    let Some(path) = &self.chain_path else {
      return Ok(());
    };
    let to_transport = |e: io::Error| LedgerError::Transport {
      message: format!("failed to write chain state {}: {}", path.display(), e),
    };

    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).map_err(to_transport)?;
    }
    let content = serde_json::to_string_pretty(chain).map_err(|e| LedgerError::Malformed {
      message: e.to_string(),
    })?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).map_err(to_transport)?;
    fs::rename(&temp_path, path).map_err(to_transport)?;
    Ok(())
  }

  /// Make every deployment of `kind` revert.
  pub fn fail_deploys_of(&self, kind: &str) {
    self.lock().faults.deploy_kinds.insert(kind.to_string());
  }

  /// Make every send of `method` revert.
  pub fn fail_sends_of(&self, method: &str) {
    self.lock().faults.send_methods.insert(method.to_string());
  }

  /// Make attach report the ledger as unreachable.
  pub fn set_unreachable(&self, unreachable: bool) {
    self.lock().faults.unreachable = unreachable;
  }

  pub fn clear_faults(&self) {
    self.lock().faults = Faults::default();
  }

  /// Forget the contract at `address`, as if the chain had been reset.
  pub fn remove_contract(&self, address: &Address) -> bool {
    let mut inner = self.lock();
    let removed = inner
      .chain
      .contracts
      .remove(&address.as_str().to_ascii_lowercase())
      .is_some();
    if removed {
      let chain = inner.chain.clone();
      drop(inner);
      // Best effort: a failed mirror write only affects later processes.
      let _ = self.save(&chain);
    }
    removed
  }

  pub fn is_deployed(&self, address: &Address) -> bool {
    self.lock().chain.contract(address).is_some()
  }

  pub fn contract_count(&self) -> usize {
    self.lock().chain.contracts.len()
  }

  /// Deployments submitted through this instance.
  pub fn deploy_count(&self) -> usize {
    self.lock().counters.deploys
  }

  /// Sends submitted through this instance.
  pub fn send_count(&self) -> usize {
    self.lock().counters.sends
  }

  /// `<kind>.<method>` for every confirmed send, in order.
  pub fn sent_methods(&self) -> Vec<String> {
    self.lock().counters.sent.clone()
  }

  /// Constructor arguments of the contract at `address`.
  pub fn constructor_args(&self, address: &Address) -> Option<Vec<Arg>> {
    self.lock().chain.contract(address).map(|c| c.constructor_args.clone())
  }
}

/// `oracleDollar` is answered by the last `setOracleDollar`.
fn setter_for(getter: &str) -> String {
  let mut chars = getter.chars();
  match chars.next() {
    Some(first) => format!("set{}{}", first.to_ascii_uppercase(), chars.as_str()),
    None => String::new(),
  }
}

fn args_to_json(args: &[Arg]) -> serde_json::Value {
  match args {
    [] => serde_json::Value::Null,
    [single] => serde_json::Value::String(single.to_string()),
    many => serde_json::Value::Array(many.iter().map(|a| serde_json::Value::String(a.to_string())).collect()),
  }
}

#[async_trait]
impl RemoteLedger for SimulatedLedger {
  fn name(&self) -> &str {
    "simulated"
  }

  async fn deploy(&self, kind: &ContractKind, args: &[Arg]) -> Result<Deployment, LedgerError> {
    let mut inner = self.lock();
    if inner.faults.deploy_kinds.contains(kind.as_str()) {
      return Err(LedgerError::Rejected {
        reason: format!("simulated revert deploying {}", kind),
      });
    }

    let (block_number, tx_hash) = inner.chain.next_tx();
    let address = Address::from_bytes(&digest(ADDRESS_DOMAIN, inner.chain.nonce));
    inner.chain.contracts.insert(
      address.as_str().to_ascii_lowercase(),
      SimContract {
        kind: kind.clone(),
        address: address.clone(),
        constructor_args: args.to_vec(),
        storage: BTreeMap::new(),
      },
    );
    inner.counters.deploys += 1;
    let chain = inner.chain.clone();
    drop(inner);

    self.save(&chain)?;
    debug!(kind = %kind, address = %address, "simulated deploy");
    Ok(Deployment {
      address,
      tx_hash,
      block_number,
    })
  }

  async fn attach(&self, kind: &ContractKind, address: &Address) -> Result<ContractHandle, AttachError> {
    let inner = self.lock();
    if inner.faults.unreachable {
      return Err(AttachError::Unreachable {
        address: address.clone(),
        message: "simulated ledger unreachable".to_string(),
      });
    }

    match inner.chain.contract(address) {
      None => Err(AttachError::NotDeployed {
        address: address.clone(),
      }),
      Some(contract) if contract.kind != *kind => Err(AttachError::KindMismatch {
        address: address.clone(),
        expected: kind.clone(),
        found: contract.kind.clone(),
      }),
      Some(contract) => Ok(ContractHandle {
        kind: contract.kind.clone(),
        address: contract.address.clone(),
      }),
    }
  }

  async fn call(&self, handle: &ContractHandle, method: &str, _args: &[Arg]) -> Result<serde_json::Value, LedgerError> {
    let inner = self.lock();
    let contract = inner
      .chain
      .contract(&handle.address)
      .ok_or_else(|| LedgerError::NoContract(handle.address.clone()))?;

    let value = match method {
      "kind" => serde_json::Value::String(contract.kind.to_string()),
      "constructorArgs" => serde_json::Value::Array(
        contract
          .constructor_args
          .iter()
          .map(|a| serde_json::Value::String(a.to_string()))
          .collect(),
      ),
      getter => contract
        .storage
        .get(&setter_for(getter))
        .map(|args| args_to_json(args))
        .unwrap_or(serde_json::Value::Null),
    };
    Ok(value)
  }

  async fn send(&self, handle: &ContractHandle, method: &str, args: &[Arg]) -> Result<Receipt, LedgerError> {
    let mut inner = self.lock();
    if inner.chain.contract(&handle.address).is_none() {
      return Err(LedgerError::NoContract(handle.address.clone()));
    }
    if inner.faults.send_methods.contains(method) {
      return Err(LedgerError::Rejected {
        reason: format!("simulated revert calling {}", method),
      });
    }

    let (block_number, tx_hash) = inner.chain.next_tx();
    let kind = match inner.chain.contract_mut(&handle.address) {
      Some(contract) => {
        contract.storage.insert(method.to_string(), args.to_vec());
        contract.kind.clone()
      }
      None => return Err(LedgerError::NoContract(handle.address.clone())),
    };
    inner.counters.sends += 1;
    inner.counters.sent.push(format!("{}.{}", kind, method));
    let chain = inner.chain.clone();
    drop(inner);

    self.save(&chain)?;
    debug!(address = %handle.address, method, "simulated send");
    Ok(Receipt { tx_hash, block_number })
  }
}
