//! CLI output formatting utilities.
//!
//! Colored status lines on a terminal, plain text otherwise.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use ironstep_lib::execute::PlannedAction;

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ADD: &str = "+";
  pub const MODIFY: &str = "~";
  pub const KEEP: &str = "=";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// One line of `ironstep plan` output.
pub fn print_planned(action: PlannedAction, name: &str, reason: Option<&str>) {
  let (symbol, verb) = match action {
    PlannedAction::Deploy => (symbols::ADD, "deploy"),
    PlannedAction::Redeploy => (symbols::MODIFY, "redeploy"),
    PlannedAction::Execute => (symbols::ADD, "execute"),
    PlannedAction::Attach => (symbols::KEEP, "attach"),
    PlannedAction::Skip => (symbols::KEEP, "skip"),
    PlannedAction::External => (symbols::INFO, "external"),
  };
  let symbol = match action {
    PlannedAction::Deploy | PlannedAction::Execute => symbol.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
    PlannedAction::Redeploy => symbol.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    _ => symbol.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string(),
  };
  match reason {
    Some(reason) => println!(
      "  {} {:<9} {} {}",
      symbol,
      verb,
      name,
      format!("({})", reason).if_supports_color(Stream::Stdout, |s| s.dimmed())
    ),
    None => println!("  {} {:<9} {}", symbol, verb, name),
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
