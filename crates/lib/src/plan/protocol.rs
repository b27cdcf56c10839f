//! The IRON protocol topology.
//!
//! Collateral, timelock, treasury, the two tokens, the collateral pool, the
//! price oracles, then the wiring calls that connect them. Resource names
//! match the keys earlier deployments left in their state files, so an old
//! `results.json` resumes rather than redeploys.

use super::{ArgSource, Plan, PlanError, Step};
use crate::config::{DeployConfig, FeedConfig, FeedSource};
use crate::ledger::{Arg, ContractKind};

const TREASURY: &str = "Treasury";
const DOLLAR: &str = "Dollar";
const SHARE: &str = "Share";
const SHARE_PAIR_ORACLE: &str = "PairOracle_SHARE_BNB";
const COLLATERAL_ORACLE: &str = "BusdOracle";
const DOLLAR_ORACLE: &str = "DollarOracle";
const SHARE_ORACLE: &str = "ShareOracle";

fn lit(arg: impl Into<Arg>) -> ArgSource {
  ArgSource::Literal(arg.into())
}

fn addr(name: &str) -> ArgSource {
  ArgSource::address_of(name)
}

fn resource(name: &str, kind: &str, args: Vec<ArgSource>) -> Step {
  Step::Resource {
    name: name.to_string(),
    kind: ContractKind::new(kind),
    args,
  }
}

fn task(name: &str, target: &str, method: &str, args: Vec<ArgSource>) -> Step {
  Step::Task {
    name: name.to_string(),
    target: target.to_string(),
    method: method.to_string(),
    args,
  }
}

fn feed(name: &str, mock_name: &str, config: &FeedConfig) -> (String, Step) {
  match config.source() {
    FeedSource::External(address) => (
      name.to_string(),
      Step::External {
        name: name.to_string(),
        kind: ContractKind::new("ChainlinkAggregator"),
        address,
      },
    ),
    FeedSource::Mock { answer, decimals } => (
      mock_name.to_string(),
      resource(
        mock_name,
        "MockChainlinkAggregator",
        vec![lit(answer), lit(u128::from(decimals))],
      ),
    ),
  }
}

/// Build the full protocol plan from `config`.
pub fn protocol_plan(config: &DeployConfig) -> Result<Plan, PlanError> {
  let sym = config.collateral.symbol.as_str();
  let mut steps = Vec::new();

  // Collateral token.
  let collateral = match &config.collateral.address {
    Some(address) => {
      steps.push(Step::External {
        name: sym.to_string(),
        kind: ContractKind::new("ERC20"),
        address: address.clone(),
      });
      sym.to_string()
    }
    None => {
      let name = format!("Mock{}", sym);
      steps.push(resource(
        &name,
        "MockCollateral",
        vec![
          lit(config.deployer.clone()),
          lit(config.collateral.supply.0),
          lit(Arg::str(sym)),
          lit(u128::from(config.collateral.decimals)),
        ],
      ));
      name
    }
  };

  steps.push(resource(
    "Timelock",
    "Timelock",
    vec![
      lit(config.timelock_admin().clone()),
      lit(u128::from(config.timelock.delay.as_secs())),
    ],
  ));
  steps.push(resource(TREASURY, "Treasury", vec![]));
  steps.push(resource(
    DOLLAR,
    "Dollar",
    vec![
      lit(Arg::str(&config.dollar.name)),
      lit(Arg::str(&config.dollar.symbol)),
      addr(TREASURY),
    ],
  ));
  steps.push(resource(
    SHARE,
    "Share",
    vec![
      lit(Arg::str(&config.share.name)),
      lit(Arg::str(&config.share.symbol)),
      addr(TREASURY),
      lit(config.share.dev_fund.clone()),
      lit(u128::from(config.share.vesting_start)),
    ],
  ));

  let pool = format!("Pool{}", sym);
  steps.push(resource(
    &pool,
    "Pool",
    vec![
      addr(DOLLAR),
      addr(SHARE),
      addr(&collateral),
      addr(TREASURY),
      lit(config.pool.ceiling.0),
    ],
  ));

  // Price oracles.
  let dollar_pair = format!("PairOracle_DOLLAR_{}", sym);
  steps.push(resource(
    &dollar_pair,
    "MockPairOracle",
    vec![lit(config.oracles.dollar_pair_price.0)],
  ));
  steps.push(resource(
    SHARE_PAIR_ORACLE,
    "MockPairOracle",
    vec![lit(config.oracles.share_pair_price.0)],
  ));

  let (collateral_feed, step) = feed(
    &format!("Feed_{}_USD", sym),
    &format!("MockChainlinkAggregator_{}_USD", sym),
    &config.oracles.collateral_usd,
  );
  steps.push(step);
  let (bnb_feed, step) = feed("Feed_BNB_USD", "MockChainlinkAggregator_BNB_USD", &config.oracles.bnb_usd);
  steps.push(step);

  steps.push(resource(COLLATERAL_ORACLE, "BusdOracle", vec![addr(&collateral_feed)]));
  steps.push(resource(
    DOLLAR_ORACLE,
    "DollarOracle",
    vec![addr(DOLLAR), addr(&dollar_pair), addr(COLLATERAL_ORACLE)],
  ));
  steps.push(resource(
    SHARE_ORACLE,
    "ShareOracle",
    vec![addr(SHARE), addr(SHARE_PAIR_ORACLE), addr(&bnb_feed)],
  ));

  // Wiring.
  steps.push(task(
    &format!("pool{}.setOracle", sym),
    &pool,
    "setOracle",
    vec![addr(COLLATERAL_ORACLE)],
  ));
  steps.push(task(
    "treasury.setDollarAddress",
    TREASURY,
    "setDollarAddress",
    vec![addr(DOLLAR)],
  ));
  steps.push(task(
    "treasury.setShareAddress",
    TREASURY,
    "setShareAddress",
    vec![addr(SHARE)],
  ));
  steps.push(task(
    "treasury.setOracleDollar",
    TREASURY,
    "setOracleDollar",
    vec![addr(DOLLAR_ORACLE)],
  ));
  steps.push(task(
    "treasury.setOracleShare",
    TREASURY,
    "setOracleShare",
    vec![addr(SHARE_ORACLE)],
  ));
  steps.push(task("treasury.addPool", TREASURY, "addPool", vec![addr(&pool)]));

  for operator in &config.operators {
    steps.push(task(
      &format!("treasury.{}", operator.method),
      TREASURY,
      &operator.method,
      vec![lit(operator.address.clone())],
    ));
  }

  // Finalization: shorten the pair oracle period and take a first sample.
  if let Some(period) = config.oracles.period {
    for (prefix, oracle) in [
      (format!("oracle_DOLLAR_{}", sym), dollar_pair.as_str()),
      ("oracle_SHARE_BNB".to_string(), SHARE_PAIR_ORACLE),
    ] {
      steps.push(task(
        &format!("{}.setPeriod", prefix),
        oracle,
        "setPeriod",
        vec![lit(u128::from(period))],
      ));
      steps.push(task(&format!("{}.update", prefix), oracle, "update", vec![]));
    }
  }

  Plan::new(steps)
}
