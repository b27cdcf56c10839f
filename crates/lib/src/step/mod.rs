//! Idempotent step primitives.
//!
//! [`Steps`] threads one [`StepRecord`] and one [`RemoteLedger`] through the
//! three primitives the orchestrator is built from:
//!
//! - [`Steps::ensure`] / [`Steps::resource`]: create-or-fetch a contract
//! - [`Steps::run_once`]: execute a configuration call at most once
//! - [`Steps::record_verification`]: write-once constructor arguments
//!
//! Every primitive records its completion in the record before returning,
//! and records nothing when it fails.

mod resource;
mod task;
mod verify;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{AttachError, LedgerError, RemoteLedger};
use crate::store::{StepKey, StepRecord};

pub use resource::Origin;
pub use task::{TaskOutcome, TaskRun};
pub use verify::{VerifyArgs, VerifyEntry, export, render_script};

/// What to do when a recorded address cannot be confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachPolicy {
  /// Redeploy only when the ledger proves the contract is absent.
  ///
  /// An unreachable ledger aborts the run instead of risking a duplicate.
  #[default]
  Strict,
  /// Redeploy on any attach failure.
  Redeploy,
}

/// Errors raised by step primitives.
#[derive(Debug, Error)]
pub enum StepError {
  /// The action inside a step failed; nothing was recorded for it.
  #[error("step {step} failed: {source}")]
  Execution {
    step: String,
    #[source]
    source: LedgerError,
  },

  /// The recorded address could not be confirmed either way.
  #[error("cannot confirm {name} at {address}, refusing to redeploy: {source}")]
  AmbiguousAttach {
    name: String,
    address: String,
    #[source]
    source: AttachError,
  },

  /// An external address given in configuration does not resolve.
  #[error("external {name} is not usable: {source}")]
  External {
    name: String,
    #[source]
    source: AttachError,
  },

  /// A persisted value does not decode as its key family's type.
  #[error("entry {key} is corrupt: {message}")]
  CorruptEntry { key: String, message: String },

  /// A value could not be encoded for the record.
  #[error("failed to encode {key}: {source}")]
  Encode {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Step primitives bound to one record and one ledger.
pub struct Steps<'a, L: RemoteLedger + ?Sized> {
  record: &'a mut StepRecord,
  ledger: &'a L,
  policy: AttachPolicy,
}

impl<'a, L: RemoteLedger + ?Sized> Steps<'a, L> {
  pub fn new(record: &'a mut StepRecord, ledger: &'a L) -> Self {
    Self {
      record,
      ledger,
      policy: AttachPolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: AttachPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn record(&self) -> &StepRecord {
    self.record
  }

  /// Drop `key` from the record so its step runs again.
  pub fn forget(&mut self, key: &StepKey) -> Option<String> {
    self.record.remove(key)
  }
}
