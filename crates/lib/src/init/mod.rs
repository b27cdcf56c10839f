//! Scaffold a deployment directory.
//!
//! `ironstep init` writes a starter `ironstep.toml`. It never touches an
//! existing config, state file or chain state.

mod templates;

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::consts::CONFIG_FILENAME;

pub use templates::CONFIG_TEMPLATE;

/// Errors that can occur during initialization.
#[derive(Debug, Error)]
pub enum InitError {
  #[error("file already exists: {}", path.display())]
  PathExists { path: PathBuf },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },

  #[error("failed to canonicalize path {}: {source}", path.display())]
  Canonicalize { path: PathBuf, source: std::io::Error },
}

/// Options for initializing a deployment directory.
pub struct InitOptions {
  /// Directory to create the config in
  pub dir: PathBuf,
}

/// Result of a successful initialization.
#[derive(Debug)]
pub struct InitResult {
  /// The deployment directory (canonicalized)
  pub dir: PathBuf,
  /// Path to the created config
  pub config: PathBuf,
}

/// Write a template config into `options.dir`, creating the directory.
///
/// # Errors
///
/// Returns [`InitError::PathExists`] if a config is already there.
pub fn init(options: &InitOptions) -> Result<InitResult, InitError> {
  fs::create_dir_all(&options.dir).map_err(|e| InitError::CreateDir {
    path: options.dir.clone(),
    source: e,
  })?;

  let dir = dunce::canonicalize(&options.dir).map_err(|e| InitError::Canonicalize {
    path: options.dir.clone(),
    source: e,
  })?;

  let config = dir.join(CONFIG_FILENAME);
  if config.exists() {
    return Err(InitError::PathExists { path: config });
  }

  fs::write(&config, CONFIG_TEMPLATE).map_err(|e| InitError::WriteFile {
    path: config.clone(),
    source: e,
  })?;

  info!(path = %config.display(), "config written");
  Ok(InitResult { dir, config })
}
