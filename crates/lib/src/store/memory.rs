//! In-memory step storage for tests and dry runs.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{StepRecord, StepStorage, StoreError};

#[derive(Debug, Default)]
struct Inner {
  record: Option<StepRecord>,
  persist_count: usize,
  fail_writes: bool,
}

/// Step storage backed by shared memory.
///
/// Clones share the same underlying record, so a test can hand one clone to
/// the code under test and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Storage pre-populated as if a previous run had persisted `record`.
  pub fn with_record(record: StepRecord) -> Self {
    let storage = Self::new();
    storage.lock().record = Some(record);
    storage
  }

  /// Make every subsequent persist fail with a write error.
  pub fn fail_writes(&self, fail: bool) {
    self.lock().fail_writes = fail;
  }

  /// Number of persist attempts so far, failed ones included.
  pub fn persist_count(&self) -> usize {
    self.lock().persist_count
  }

  /// The last successfully persisted record, if any.
  pub fn persisted(&self) -> Option<StepRecord> {
    self.lock().record.clone()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // A poisoned lock only means another test thread panicked mid-update.
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl StepStorage for MemoryStorage {
  fn load(&self) -> Result<StepRecord, StoreError> {
    Ok(self.lock().record.clone().unwrap_or_default())
  }

  fn persist(&self, record: &StepRecord) -> Result<(), StoreError> {
    let mut inner = self.lock();
    inner.persist_count += 1;
    if inner.fail_writes {
      return Err(StoreError::Write {
        path: PathBuf::from("<memory>"),
        source: io::Error::other("simulated write failure"),
      });
    }
    inner.record = Some(record.clone());
    Ok(())
  }

  fn location(&self) -> String {
    "<memory>".to_string()
  }
}
