mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::Workspace;

/// ironstep - resumable deployment of the IRON protocol
#[derive(Parser)]
#[command(name = "ironstep")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Deployment config (default: $IRONSTEP_CONFIG, then ./ironstep.toml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// State file (default: $IRONSTEP_STATE, then `state_file` from the config, then results.json next to it)
  #[arg(long, global = true)]
  state: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Write a template ironstep.toml
  Init {
    /// Directory to create the config in
    #[arg(default_value = ".")]
    dir: PathBuf,
  },

  /// Deploy the protocol, resuming from the state file
  Deploy,

  /// Show what a deploy would do, without submitting anything
  Plan {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// List recorded resources, tasks and verification entries
  Status {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Write the contract verification script
  Verify {
    /// Script path (default: `verify_script` from the config, then verify.sh next to it)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the script instead of writing it
    #[arg(long, conflicts_with = "output")]
    stdout: bool,
  },

  /// Read-only call against a recorded resource
  Call {
    /// Resource name, e.g. Treasury
    resource: String,

    /// Method name, e.g. dollarAddress
    method: String,

    /// Call arguments
    args: Vec<String>,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let workspace = Workspace::new(cli.config, cli.state, cli.verbose);

  let result = match cli.command {
    Commands::Init { dir } => cmd::cmd_init(&dir).map(|()| ExitCode::SUCCESS),
    Commands::Deploy => cmd::cmd_deploy(&workspace),
    Commands::Plan { json } => cmd::cmd_plan(&workspace, json).map(|()| ExitCode::SUCCESS),
    Commands::Status { json } => cmd::cmd_status(&workspace, json).map(|()| ExitCode::SUCCESS),
    Commands::Verify { output, stdout } => {
      cmd::cmd_verify(&workspace, output.as_deref(), stdout).map(|()| ExitCode::SUCCESS)
    }
    Commands::Call { resource, method, args } => {
      cmd::cmd_call(&workspace, &resource, &method, &args).map(|()| ExitCode::SUCCESS)
    }
  };

  match result {
    Ok(code) => code,
    Err(err) => {
      output::print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
