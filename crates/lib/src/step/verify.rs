//! Verification argument recording and export.
//!
//! `verify-<name>` holds the constructor arguments exactly as submitted, as a
//! JSON array of strings. Entries are write-once: a later redeploy under the
//! same name keeps the original arguments.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{StepError, Steps};
use crate::ledger::{Arg, RemoteLedger};
use crate::store::{StepKey, StepRecord};

/// Ordered constructor arguments as verification strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifyArgs(pub Vec<String>);

impl VerifyArgs {
  pub fn from_args(args: &[Arg]) -> Self {
    Self(args.iter().map(Arg::to_string).collect())
  }

  pub fn encode(&self) -> String {
    serde_json::Value::from(self.0.clone()).to_string()
  }

  pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(raw)
  }
}

/// One resource ready for source verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyEntry {
  pub name: String,
  /// Currently recorded address, if the resource has one.
  pub address: Option<String>,
  pub args: VerifyArgs,
}

impl<'a, L: RemoteLedger + ?Sized> Steps<'a, L> {
  /// Record `args` for `name` unless already recorded. Returns whether it wrote.
  pub fn record_verification(&mut self, name: &str, args: &[Arg]) -> bool {
    let key = StepKey::verify(name);
    if self.record.contains(&key) {
      debug!(resource = name, "verification arguments already recorded");
      return false;
    }
    self.record.set(key, VerifyArgs::from_args(args).encode());
    true
  }
}

/// Collect every `verify-*` entry together with its resource's address.
pub fn export(record: &StepRecord) -> Result<Vec<VerifyEntry>, StepError> {
  record
    .iter()
    .filter_map(|(key, raw)| match key {
      StepKey::Verify(name) => Some((name, raw)),
      _ => None,
    })
    .map(|(name, raw)| -> Result<VerifyEntry, StepError> {
      let args = VerifyArgs::decode(raw).map_err(|e| StepError::CorruptEntry {
        key: StepKey::verify(name.as_str()).to_string(),
        message: e.to_string(),
      })?;
      let address = record.get(&StepKey::resource(name.as_str())).map(str::to_string);
      Ok(VerifyEntry { name, address, args })
    })
    .collect()
}

/// Render a shell script with one verification command per entry.
///
/// Entries without a recorded address are emitted as comments. Every
/// argument is single-quoted so `sh` passes it through untouched.
pub fn render_script(entries: &[VerifyEntry], network: &str) -> String {
  let network = shell_word(network);
  let blocks: Vec<String> = entries
    .iter()
    .map(|entry| match &entry.address {
      Some(address) => {
        let mut command = format!("npx hardhat verify --network {} {}", network, address);
        for arg in &entry.args.0 {
          command.push(' ');
          command.push_str(&single_quote(arg));
        }
        format!("# verify {}\n{}", entry.name, command)
      }
      None => format!("# verify {}\n# skipped: no recorded address", entry.name),
    })
    .collect();

  format!("#!/usr/bin/env sh\n\n{}\n", blocks.join("\n\n"))
}

/// Quote `value` for POSIX `sh`; an embedded `'` becomes `'\''`.
fn single_quote(value: &str) -> String {
  format!("'{}'", value.replace('\'', r"'\''"))
}

/// Leave plain words bare, quote anything the shell would interpret.
fn shell_word(value: &str) -> String {
  let plain = !value.is_empty()
    && value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':'));
  if plain { value.to_string() } else { single_quote(value) }
}
