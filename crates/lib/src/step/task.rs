//! Execute-once task step.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{StepError, Steps};
use crate::ledger::{LedgerError, Receipt, RemoteLedger};
use crate::store::StepKey;

/// The recorded result of a one-time task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome {
  /// The task ran and produced nothing worth keeping.
  Empty,
  /// The task was a confirmed transaction.
  Transaction { tx_hash: String, block_number: u64 },
  /// The task produced a value.
  Value { value: serde_json::Value },
}

impl TaskOutcome {
  pub fn encode(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }

  /// Decode a recorded task value.
  ///
  /// Older state files store `""` or `null` for tasks without a result and
  /// arbitrary JSON otherwise; those decode as [`TaskOutcome::Empty`] and
  /// [`TaskOutcome::Value`].
  pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    match &value {
      serde_json::Value::Null => return Ok(TaskOutcome::Empty),
      serde_json::Value::String(s) if s.is_empty() => return Ok(TaskOutcome::Empty),
      _ => {}
    }
    match serde_json::from_value::<TaskOutcome>(value.clone()) {
      Ok(outcome) => Ok(outcome),
      Err(_) => Ok(TaskOutcome::Value { value }),
    }
  }
}

impl From<Receipt> for TaskOutcome {
  fn from(receipt: Receipt) -> Self {
    TaskOutcome::Transaction {
      tx_hash: receipt.tx_hash,
      block_number: receipt.block_number,
    }
  }
}

/// Result of [`Steps::run_once`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
  pub outcome: TaskOutcome,
  /// False when the outcome came from the record and nothing was executed.
  pub executed: bool,
}

impl<'a, L: RemoteLedger + ?Sized> Steps<'a, L> {
  /// Run `action` unless `task` already has a recorded outcome.
  ///
  /// On failure the error propagates and nothing is recorded, so the next
  /// run retries the same task.
  pub async fn run_once<F, Fut>(&mut self, task: &str, action: F) -> Result<TaskRun, StepError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<TaskOutcome, LedgerError>>,
  {
    let key = StepKey::task(task);

    if let Some(raw) = self.record.get(&key) {
      let outcome = TaskOutcome::decode(raw).map_err(|e| StepError::CorruptEntry {
        key: key.to_string(),
        message: e.to_string(),
      })?;
      info!(task, "already executed");
      return Ok(TaskRun {
        outcome,
        executed: false,
      });
    }

    info!(task, "executing");
    let outcome = match action().await {
      Ok(outcome) => outcome,
      Err(source) => {
        warn!(task, error = %source, "task failed");
        return Err(StepError::Execution {
          step: task.to_string(),
          source,
        });
      }
    };

    let encoded = outcome.encode().map_err(|source| StepError::Encode {
      key: key.to_string(),
      source,
    })?;
    self.record.set(key, encoded);
    info!(task, "executed");

    Ok(TaskRun {
      outcome,
      executed: true,
    })
  }
}
