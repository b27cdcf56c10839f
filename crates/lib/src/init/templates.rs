//! Template content for `ironstep init`.

/// Starter deployment config.
///
/// Parses as-is. The addresses are the first two well-known local dev
/// accounts and must be replaced before deploying anywhere real.
pub const CONFIG_TEMPLATE: &str = r#"# ironstep deployment config
#
# Relative paths are resolved against the directory of this file.

network = "bsc"
# state_file = "results.json"
# verify_script = "verify.sh"

# "strict" aborts when a recorded contract cannot be confirmed;
# "redeploy" treats any attach failure as a missing contract.
attach_policy = "strict"

deployer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"

[ledger]
backend = "simulated"
chain_state = "chain.json"

# [ledger]
# backend = "command"
# program = "node"
# args = ["scripts/ledger.js"]

[collateral]
symbol = "BUSD"
# address = "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56"
supply = "100000000000000000000000000"
decimals = 18

[timelock]
# admin = "0x..."
delay = "12h"

[dollar]
name = "IRON"
symbol = "IRON"

[share]
name = "SIL"
symbol = "SIL"
dev_fund = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
vesting_start = "2021-02-25T09:00:00Z"

[pool]
ceiling = "100000000000000000000000000"

[oracles]
dollar_pair_price = "998999"
share_pair_price = "20000"
# period = 1

[oracles.collateral_usd]
answer = "100498532"
decimals = 8

[oracles.bnb_usd]
answer = "25124633000"
decimals = 8

# [[operators]]
# method = "setRebalancePool"
# address = "0x..."
"#;
