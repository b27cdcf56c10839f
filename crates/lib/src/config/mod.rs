//! Deployment configuration.
//!
//! A single TOML file describes the ledger backend and every parameter the
//! protocol plan needs. Token amounts are decimal strings (they routinely
//! exceed 2^63), durations use humantime syntax (`"12h"`) and timestamps are
//! RFC 3339.
//!
//! ```toml
//! deployer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
//!
//! [ledger]
//! backend = "simulated"
//! chain_state = "chain.json"
//!
//! [collateral]
//! symbol = "BUSD"
//! supply = "100000000000000000000000000"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::ledger::Address;
use crate::step::AttachPolicy;

/// 100M tokens with 18 decimals.
const ONE_HUNDRED_MILLION_DEC18: u128 = 100_000_000_000_000_000_000_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid config field `{field}`: {message}")]
  Invalid { field: String, message: String },
}

impl ConfigError {
  fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
    ConfigError::Invalid {
      field: field.into(),
      message: message.into(),
    }
  }
}

/// Top-level deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
  /// Network name passed to the verification tool.
  #[serde(default = "default_network")]
  pub network: String,

  /// State file, relative to the config file.
  #[serde(default)]
  pub state_file: Option<PathBuf>,

  /// Verification script output, relative to the config file.
  #[serde(default)]
  pub verify_script: Option<PathBuf>,

  #[serde(default)]
  pub attach_policy: AttachPolicy,

  /// Account that submits transactions; receives the mock collateral supply.
  pub deployer: Address,

  #[serde(default)]
  pub ledger: LedgerConfig,

  pub collateral: CollateralConfig,

  #[serde(default)]
  pub timelock: TimelockConfig,

  #[serde(default = "default_dollar")]
  pub dollar: TokenConfig,

  pub share: ShareConfig,

  #[serde(default)]
  pub pool: PoolConfig,

  #[serde(default)]
  pub oracles: OraclesConfig,

  /// Privileged operators registered on the treasury after wiring.
  #[serde(default)]
  pub operators: Vec<OperatorConfig>,
}

impl DeployConfig {
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml(&content)
  }

  pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
    let config: DeployConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.network.trim().is_empty() {
      return Err(ConfigError::invalid("network", "must not be empty"));
    }
    if self.collateral.symbol.is_empty() || !self.collateral.symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(ConfigError::invalid("collateral.symbol", "must be non-empty ASCII alphanumeric"));
    }
    if let LedgerConfig::Command { program, .. } = &self.ledger
      && program.trim().is_empty()
    {
      return Err(ConfigError::invalid("ledger.program", "must not be empty"));
    }
    self.oracles.collateral_usd.validate("oracles.collateral_usd")?;
    self.oracles.bnb_usd.validate("oracles.bnb_usd")?;
    for (i, operator) in self.operators.iter().enumerate() {
      if operator.method.is_empty() || !operator.method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::invalid(
          format!("operators[{}].method", i),
          "must be a plain method name",
        ));
      }
    }
    Ok(())
  }

  /// Timelock admin, falling back to the deployer.
  pub fn timelock_admin(&self) -> &Address {
    self.timelock.admin.as_ref().unwrap_or(&self.deployer)
  }
}

fn default_network() -> String {
  "bsc".to_string()
}

fn default_dollar() -> TokenConfig {
  TokenConfig {
    name: "IRON".to_string(),
    symbol: "IRON".to_string(),
  }
}

/// Which ledger backend to drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum LedgerConfig {
  /// In-process simulator, optionally persisted to `chain_state`.
  Simulated {
    #[serde(default)]
    chain_state: Option<PathBuf>,
  },
  /// External program speaking JSON over stdin/stdout.
  Command {
    program: String,
    #[serde(default)]
    args: Vec<String>,
  },
}

impl Default for LedgerConfig {
  fn default() -> Self {
    LedgerConfig::Simulated { chain_state: None }
  }
}

/// Collateral token: an existing address, or a mock deployed by the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollateralConfig {
  pub symbol: String,

  /// Use an existing token instead of deploying a mock.
  ///
  /// The address is pinned in the state file; changing it later redeploys
  /// everything built against the old token.
  #[serde(default)]
  pub address: Option<Address>,

  /// Mock supply minted to the deployer.
  #[serde(default = "default_collateral_supply")]
  pub supply: Amount,

  #[serde(default = "default_token_decimals")]
  pub decimals: u8,
}

fn default_collateral_supply() -> Amount {
  Amount(ONE_HUNDRED_MILLION_DEC18)
}

fn default_token_decimals() -> u8 {
  18
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimelockConfig {
  /// Defaults to the deployer.
  #[serde(default)]
  pub admin: Option<Address>,

  #[serde(
    default = "default_timelock_delay",
    deserialize_with = "deserialize_duration",
    serialize_with = "serialize_duration"
  )]
  pub delay: Duration,
}

impl Default for TimelockConfig {
  fn default() -> Self {
    Self {
      admin: None,
      delay: default_timelock_delay(),
    }
  }
}

fn default_timelock_delay() -> Duration {
  Duration::from_secs(12 * 60 * 60)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
  pub name: String,
  pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareConfig {
  #[serde(default = "default_share_name")]
  pub name: String,

  #[serde(default = "default_share_name")]
  pub symbol: String,

  pub dev_fund: Address,

  /// Unix seconds; written in config as RFC 3339.
  #[serde(deserialize_with = "deserialize_timestamp", serialize_with = "serialize_timestamp")]
  pub vesting_start: u64,
}

fn default_share_name() -> String {
  "SIL".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
  #[serde(default = "default_pool_ceiling")]
  pub ceiling: Amount,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      ceiling: default_pool_ceiling(),
    }
  }
}

fn default_pool_ceiling() -> Amount {
  Amount(ONE_HUNDRED_MILLION_DEC18)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OraclesConfig {
  /// Mock price for the DOLLAR/collateral pair.
  #[serde(default = "default_dollar_pair_price")]
  pub dollar_pair_price: Amount,

  /// Mock price for the SHARE/BNB pair.
  #[serde(default = "default_share_pair_price")]
  pub share_pair_price: Amount,

  #[serde(default = "default_collateral_usd_feed")]
  pub collateral_usd: FeedConfig,

  #[serde(default = "default_bnb_usd_feed")]
  pub bnb_usd: FeedConfig,

  /// When set, pair oracles get `setPeriod(period)` and `update()` after wiring.
  #[serde(default)]
  pub period: Option<u64>,
}

impl Default for OraclesConfig {
  fn default() -> Self {
    Self {
      dollar_pair_price: default_dollar_pair_price(),
      share_pair_price: default_share_pair_price(),
      collateral_usd: default_collateral_usd_feed(),
      bnb_usd: default_bnb_usd_feed(),
      period: None,
    }
  }
}

fn default_dollar_pair_price() -> Amount {
  Amount(998_999)
}

fn default_share_pair_price() -> Amount {
  Amount(20_000)
}

fn default_collateral_usd_feed() -> FeedConfig {
  FeedConfig {
    address: None,
    answer: Some(Amount(100_498_532)),
    decimals: 8,
  }
}

fn default_bnb_usd_feed() -> FeedConfig {
  FeedConfig {
    address: None,
    answer: Some(Amount(25_124_633_000)),
    decimals: 8,
  }
}

/// A price feed: an existing aggregator, or a mock answering a fixed price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
  /// Existing aggregator. Pinned like the collateral address.
  #[serde(default)]
  pub address: Option<Address>,

  #[serde(default)]
  pub answer: Option<Amount>,

  #[serde(default = "default_feed_decimals")]
  pub decimals: u8,
}

fn default_feed_decimals() -> u8 {
  8
}

/// Resolved form of [`FeedConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
  External(Address),
  Mock { answer: u128, decimals: u8 },
}

impl FeedConfig {
  fn validate(&self, field: &str) -> Result<(), ConfigError> {
    match (&self.address, &self.answer) {
      (Some(_), Some(_)) => Err(ConfigError::invalid(field, "set either `address` or `answer`, not both")),
      (None, None) => Err(ConfigError::invalid(field, "one of `address` or `answer` is required")),
      _ => Ok(()),
    }
  }

  pub fn source(&self) -> FeedSource {
    match (&self.address, &self.answer) {
      (Some(address), _) => FeedSource::External(address.clone()),
      (None, answer) => FeedSource::Mock {
        answer: answer.map(|a| a.0).unwrap_or_default(),
        decimals: self.decimals,
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
  /// Treasury setter, e.g. `setRebalancePool`.
  pub method: String,
  pub address: Address,
}

/// An unsigned token amount.
///
/// Accepts a TOML integer or a decimal string; serializes as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount(pub u128);

impl Serialize for Amount {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0.to_string())
  }
}

impl<'de> Deserialize<'de> for Amount {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
      type Value = Amount;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or decimal string")
      }

      fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(u128::from(v)))
      }

      fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u128::try_from(v)
          .map(Amount)
          .map_err(|_| E::custom(format!("amount must not be negative, got {}", v)))
      }

      fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.trim()
          .parse::<u128>()
          .map(Amount)
          .map_err(|e| E::custom(format!("invalid amount {:?}: {}", v, e)))
      }
    }

    deserializer.deserialize_any(AmountVisitor)
  }
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
  let raw = String::deserialize(deserializer)?;
  humantime::parse_duration(&raw).map_err(de::Error::custom)
}

fn serialize_duration<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
  let raw = String::deserialize(deserializer)?;
  let time = humantime::parse_rfc3339_weak(&raw).map_err(de::Error::custom)?;
  time
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .map_err(|_| de::Error::custom(format!("{} is before the unix epoch", raw)))
}

fn serialize_timestamp<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
  let time = UNIX_EPOCH + Duration::from_secs(*value);
  serializer.serialize_str(&humantime::format_rfc3339_seconds(time).to_string())
}
