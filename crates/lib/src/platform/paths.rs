use std::path::{Path, PathBuf};

use crate::consts::{CONFIG_ENV, CONFIG_FILENAME, STATE_ENV, STATE_FILENAME, VERIFY_SCRIPT_FILENAME};

/// Returns the deployment config file.
///
/// Precedence: `explicit`, then `$IRONSTEP_CONFIG`, then `ironstep.toml` in
/// the working directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
  explicit
    .map(Path::to_path_buf)
    .or_else(|| env_path(CONFIG_ENV))
    .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
}

/// Returns the directory relative paths in the config are resolved against.
pub fn config_dir(config_path: &Path) -> PathBuf {
  match config_path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => PathBuf::from("."),
  }
}

/// Returns the state file.
///
/// Precedence: `explicit`, then `$IRONSTEP_STATE`, then `configured` (relative
/// to the config file), then `results.json` next to the config file.
pub fn state_path(explicit: Option<&Path>, configured: Option<&Path>, config_path: &Path) -> PathBuf {
  if let Some(path) = explicit {
    return path.to_path_buf();
  }
  if let Some(path) = env_path(STATE_ENV) {
    return path;
  }
  let base = config_dir(config_path);
  match configured {
    Some(path) => relative_to(&base, path),
    None => base.join(STATE_FILENAME),
  }
}

/// Returns where `ironstep verify` writes its script.
///
/// Precedence: `explicit`, then `configured` (relative to the config file),
/// then `verify.sh` next to the config file.
pub fn verify_script_path(explicit: Option<&Path>, configured: Option<&Path>, config_path: &Path) -> PathBuf {
  if let Some(path) = explicit {
    return path.to_path_buf();
  }
  let base = config_dir(config_path);
  match configured {
    Some(path) => relative_to(&base, path),
    None => base.join(VERIFY_SCRIPT_FILENAME),
  }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn relative_to(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  }
}

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}
