/// Default config file name, resolved relative to the working directory.
pub const CONFIG_FILENAME: &str = "ironstep.toml";

/// Default state file name, resolved relative to the config file.
pub const STATE_FILENAME: &str = "results.json";

/// Default verification script name, resolved relative to the config file.
pub const VERIFY_SCRIPT_FILENAME: &str = "verify.sh";

/// Key prefix for one-time task results.
pub const TASK_KEY_PREFIX: &str = "task.";

/// Key prefix for recorded verification arguments.
pub const VERIFY_KEY_PREFIX: &str = "verify-";

pub const STATE_ENV: &str = "IRONSTEP_STATE";
pub const CONFIG_ENV: &str = "IRONSTEP_CONFIG";
