//! The remote ledger capability.
//!
//! The pipeline never talks to a network directly. Everything it needs from
//! the ledger goes through [`RemoteLedger`], which is injected into the
//! orchestrator so a simulated ledger can stand in for a real one.
//!
//! Every operation is confirmation-awaited: when a future resolves `Ok`, the
//! ledger has included the transaction.

mod command;
mod simulated;
mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use command::CommandLedger;
pub use simulated::SimulatedLedger;
pub use types::{Address, AddressParseError, Arg, ContractHandle, ContractKind, Deployment, Receipt};

/// Why a recorded address could not be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
  /// Nothing is deployed at the address (empty code).
  #[error("no contract deployed at {address}")]
  NotDeployed { address: Address },

  /// Something is deployed, but it is not the expected kind of contract.
  #[error("contract at {address} is a {found}, expected {expected}")]
  KindMismatch {
    address: Address,
    expected: ContractKind,
    found: ContractKind,
  },

  /// The recorded value is not an address at all.
  #[error("recorded value {0:?} is not an address")]
  InvalidAddress(String),

  /// The ledger could not be asked (connectivity, timeout, rate limit).
  #[error("could not resolve {address}: {message}")]
  Unreachable { address: Address, message: String },
}

impl AttachError {
  /// Whether this failure proves the resource is not deployed at the address.
  ///
  /// `Unreachable` proves nothing: the contract may well be live.
  pub fn is_definitive(&self) -> bool {
    !matches!(self, AttachError::Unreachable { .. })
  }
}

/// Errors from state-changing or read-only ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
  /// The ledger rejected or reverted the operation.
  #[error("rejected: {reason}")]
  Rejected { reason: String },

  /// The operation could not be submitted or its confirmation was not observed.
  #[error("transport error: {message}")]
  Transport { message: String },

  /// No contract at the target address.
  #[error("no contract deployed at {0}")]
  NoContract(Address),

  /// The ledger answered with something that could not be understood.
  #[error("malformed ledger response: {message}")]
  Malformed { message: String },
}

/// Capability to deploy, attach to, and invoke contracts on a ledger.
#[async_trait]
pub trait RemoteLedger: Send + Sync {
  /// Short backend name, for logs.
  fn name(&self) -> &str;

  /// Deploy a new instance of `kind` and wait for inclusion.
  async fn deploy(&self, kind: &ContractKind, args: &[Arg]) -> Result<Deployment, LedgerError>;

  /// Confirm that `address` holds a live instance of `kind`.
  ///
  /// Read-only; never submits a transaction.
  async fn attach(&self, kind: &ContractKind, address: &Address) -> Result<ContractHandle, AttachError>;

  /// Read-only call.
  async fn call(&self, handle: &ContractHandle, method: &str, args: &[Arg]) -> Result<serde_json::Value, LedgerError>;

  /// State-changing call; resolves once the transaction is confirmed.
  async fn send(&self, handle: &ContractHandle, method: &str, args: &[Arg]) -> Result<Receipt, LedgerError>;
}
