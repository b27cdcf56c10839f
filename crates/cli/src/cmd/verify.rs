//! Implementation of the `ironstep verify` command.
//!
//! Renders every recorded `verify-*` entry as a block-explorer verification
//! command and writes them out as a shell script.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use ironstep_lib::platform::paths;
use ironstep_lib::step::{export, render_script};

use super::Workspace;
use crate::output::{print_info, print_success, print_warning};

pub fn cmd_verify(workspace: &Workspace, output: Option<&Path>, stdout: bool) -> Result<()> {
  let config = workspace.load_config()?;
  let (state, record) = workspace.read_record(&config)?;

  let entries = export(&record).with_context(|| format!("Failed to read verification entries from {}", state.display()))?;
  let script = render_script(&entries, &config.network);

  if stdout {
    print!("{}", script);
    return Ok(());
  }

  if entries.is_empty() {
    print_info("No verification entries recorded yet. Run 'ironstep deploy' first.");
    return Ok(());
  }

  let missing: Vec<&str> = entries
    .iter()
    .filter(|e| e.address.is_none())
    .map(|e| e.name.as_str())
    .collect();
  if !missing.is_empty() {
    print_warning(&format!(
      "No recorded address for {}; their commands are commented out",
      missing.join(", ")
    ));
  }

  let path = paths::verify_script_path(output, config.verify_script.as_deref(), workspace.config_path());
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
  }
  fs::write(&path, &script).with_context(|| format!("Failed to write verify script: {}", path.display()))?;
  make_executable(&path)?;

  print_success(&format!(
    "Wrote {} verification command(s) to {}",
    entries.len() - missing.len(),
    path.display()
  ));
  Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
  use std::os::unix::fs::PermissionsExt;

  fs::set_permissions(path, fs::Permissions::from_mode(0o755))
    .with_context(|| format!("Failed to set permissions: {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
  Ok(())
}
