//! Implementation of the `ironstep init` command.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use ironstep_lib::init::{InitOptions, init};

use crate::output::symbols;

/// Write a template `ironstep.toml` into `dir`.
///
/// # Errors
///
/// Returns an error if a config already exists there or the directory cannot be written.
pub fn cmd_init(dir: &Path) -> Result<()> {
  let options = InitOptions { dir: dir.to_path_buf() };

  let result = init(&options).context("Failed to initialize deployment directory")?;

  println!(
    "{} {}",
    symbols::SUCCESS.green(),
    "Initialized ironstep deployment!".green().bold()
  );
  println!();
  println!("  {} Directory: {}", symbols::INFO.cyan(), result.dir.display());
  println!("  {} Config:    {}", symbols::INFO.cyan(), result.config.display());
  println!();
  println!("{}", "Next steps:".bold());
  println!(
    "  1. Edit {} with your deployer, dev fund and ledger",
    result.config.display().to_string().cyan()
  );
  println!(
    "  2. Run: {}",
    format!("ironstep -c {} deploy", result.config.display()).cyan()
  );

  Ok(())
}
