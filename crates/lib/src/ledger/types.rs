//! Value types exchanged with a remote ledger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of an address in hex digits, without the `0x` prefix.
const ADDRESS_HEX_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address {0:?}: expected 0x followed by 40 hex digits")]
pub struct AddressParseError(pub String);

/// A ledger address (`0x` + 40 hex digits).
///
/// Case is preserved so checksummed addresses round-trip unchanged; equality
/// ignores case.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
  pub fn parse(raw: &str) -> Result<Self, AddressParseError> {
    let hex = raw
      .strip_prefix("0x")
      .or_else(|| raw.strip_prefix("0X"))
      .ok_or_else(|| AddressParseError(raw.to_string()))?;
    if hex.len() != ADDRESS_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(AddressParseError(raw.to_string()));
    }
    Ok(Self(format!("0x{}", hex)))
  }

  /// Build an address from the first 20 bytes of `bytes`.
  pub fn from_bytes(bytes: &[u8]) -> Self {
    let take = bytes.len().min(ADDRESS_HEX_LEN / 2);
    Self(format!("0x{:0>40}", hex::encode(&bytes[..take])))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl PartialEq for Address {
  fn eq(&self, other: &Self) -> bool {
    self.0.eq_ignore_ascii_case(&other.0)
  }
}

impl std::hash::Hash for Address {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.0.to_ascii_lowercase().hash(state);
  }
}

impl fmt::Display for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for Address {
  type Err = AddressParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for Address {
  type Error = AddressParseError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<Address> for String {
  fn from(value: Address) -> Self {
    value.0
  }
}

/// Contract artifact name, e.g. `Pool` or `MockChainlinkAggregator`.
///
/// Several resources may share a kind (`PoolBUSD` and `PoolUSDC` are both `Pool`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractKind(pub String);

impl ContractKind {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ContractKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A constructor or call argument.
///
/// The `Display` form is the exact string recorded for source verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Arg {
  Address(Address),
  Uint(#[serde(with = "u128_string")] u128),
  Str(String),
  Bool(bool),
}

impl Arg {
  pub fn str(value: impl Into<String>) -> Self {
    Arg::Str(value.into())
  }

  /// Parse a command-line argument, guessing its type.
  ///
  /// Addresses, unsigned integers and booleans are recognized; anything else
  /// is passed as a string.
  pub fn guess(raw: &str) -> Self {
    if let Ok(address) = Address::parse(raw) {
      return Arg::Address(address);
    }
    if let Ok(value) = raw.parse::<u128>() {
      return Arg::Uint(value);
    }
    match raw {
      "true" => Arg::Bool(true),
      "false" => Arg::Bool(false),
      _ => Arg::Str(raw.to_string()),
    }
  }
}

impl fmt::Display for Arg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Arg::Address(address) => write!(f, "{}", address),
      Arg::Uint(value) => write!(f, "{}", value),
      Arg::Str(value) => f.write_str(value),
      Arg::Bool(value) => write!(f, "{}", value),
    }
  }
}

impl From<Address> for Arg {
  fn from(value: Address) -> Self {
    Arg::Address(value)
  }
}

impl From<u128> for Arg {
  fn from(value: u128) -> Self {
    Arg::Uint(value)
  }
}

// JSON numbers lose precision above 2^53, so uints travel as decimal strings.
mod u128_string {
  use serde::{Deserialize, Deserializer, Serializer, de::Error};

  pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(D::Error::custom)
  }
}

/// A live contract the pipeline can talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractHandle {
  pub kind: ContractKind,
  pub address: Address,
}

/// A confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
  pub address: Address,
  pub tx_hash: String,
  pub block_number: u64,
}

impl Deployment {
  pub fn into_handle(self, kind: ContractKind) -> ContractHandle {
    ContractHandle {
      kind,
      address: self.address,
    }
  }
}

/// A confirmed state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
  pub tx_hash: String,
  pub block_number: u64,
}
