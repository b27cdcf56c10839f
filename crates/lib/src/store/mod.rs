//! Step record persistence.
//!
//! The step record is the single source of truth for "has this already
//! happened": a flat map from [`StepKey`] strings to string values. It is
//! loaded once at start, mutated in memory by each step, and flushed
//! wholesale when the run ends.
//!
//! # Storage Layout
//!
//! ```text
//! results.json        # StepRecord, pretty-printed JSON object
//! results.json.tmp    # transient, only during persist
//! ```

mod key;
mod memory;

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use key::StepKey;
pub use memory::MemoryStorage;

/// Errors that can occur when loading or persisting the step record.
#[derive(Debug, Error)]
pub enum StoreError {
  /// The state file exists but is not a flat string map.
  #[error("state file {} is corrupt: {source}", path.display())]
  Corrupt {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// Failed to read the state file.
  #[error("failed to read state file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to write the state file.
  #[error("failed to write state file {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to serialize the record.
  #[error("failed to serialize step record: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// In-memory step record.
///
/// Keys are kept sorted so the persisted file diffs cleanly between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepRecord {
  entries: BTreeMap<String, String>,
}

impl StepRecord {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a record from `path`.
  ///
  /// Returns an empty record if the file doesn't exist or is blank.
  pub fn load(path: &Path) -> Result<Self, StoreError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no state file, starting empty");
        return Ok(Self::new());
      }
      Err(e) => {
        return Err(StoreError::Read {
          path: path.to_path_buf(),
          source: e,
        });
      }
    };

    if content.trim().is_empty() {
      return Ok(Self::new());
    }

    let record: StepRecord = serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
      path: path.to_path_buf(),
      source: e,
    })?;

    info!(path = %path.display(), entries = record.len(), "state loaded");
    Ok(record)
  }

  /// Persist the whole record to `path`, replacing any prior content.
  ///
  /// Uses atomic write (write to temp, fsync, then rename) so a crash
  /// mid-write leaves the previous file intact.
  pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
    let write_err = |e| StoreError::Write {
      path: path.to_path_buf(),
      source: e,
    };

    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content = serde_json::to_string_pretty(self).map_err(StoreError::Serialize)?;
    let temp_path = temp_path_for(path);
    write_synced(&temp_path, content.as_bytes()).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(write_err)?;

    info!(path = %path.display(), entries = self.len(), "state persisted");
    Ok(())
  }

  pub fn get(&self, key: &StepKey) -> Option<&str> {
    self.entries.get(&key.to_string()).map(String::as_str)
  }

  pub fn contains(&self, key: &StepKey) -> bool {
    self.entries.contains_key(&key.to_string())
  }

  /// Set `key` to `value`, returning the previous value.
  pub fn set(&mut self, key: StepKey, value: impl Into<String>) -> Option<String> {
    self.entries.insert(key.to_string(), value.into())
  }

  pub fn remove(&mut self, key: &StepKey) -> Option<String> {
    self.entries.remove(&key.to_string())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Iterate all entries as typed keys, in key order.
  pub fn iter(&self) -> impl Iterator<Item = (StepKey, &str)> {
    self.entries.iter().map(|(k, v)| (StepKey::parse(k), v.as_str()))
  }
}

impl FromIterator<(StepKey, String)> for StepRecord {
  fn from_iter<I: IntoIterator<Item = (StepKey, String)>>(iter: I) -> Self {
    Self {
      entries: iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    }
  }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
  let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
  file.write_all(bytes)?;
  file.sync_all()
}

fn temp_path_for(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}

/// Where a step record lives between runs.
pub trait StepStorage {
  fn load(&self) -> Result<StepRecord, StoreError>;

  fn persist(&self, record: &StepRecord) -> Result<(), StoreError>;

  /// Human-readable location, for logs.
  fn location(&self) -> String;
}

/// Step record stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
  path: PathBuf,
}

impl JsonFileStorage {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl StepStorage for JsonFileStorage {
  fn load(&self) -> Result<StepRecord, StoreError> {
    StepRecord::load(&self.path)
  }

  fn persist(&self, record: &StepRecord) -> Result<(), StoreError> {
    record.persist(&self.path)
  }

  fn location(&self) -> String {
    self.path.display().to_string()
  }
}
