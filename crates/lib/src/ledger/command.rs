//! Ledger backed by an external program.
//!
//! Each operation spawns the configured program once, writes a single JSON
//! request to its stdin and reads a single JSON response from its stdout:
//!
//! ```text
//! -> {"op":"deploy","kind":"Treasury","args":[]}
//! <- {"address":"0x...","tx_hash":"0x...","block_number":12}
//!
//! -> {"op":"attach","kind":"Treasury","address":"0x..."}
//! <- {"status":"ok"} | {"status":"not_deployed"} | {"status":"kind_mismatch","found":"Pool"}
//!
//! -> {"op":"call","address":"0x...","method":"oracle","args":[]}
//! <- <any json value>
//!
//! -> {"op":"send","address":"0x...","method":"addPool","args":[...]}
//! <- {"tx_hash":"0x...","block_number":13}
//! ```
//!
//! A non-zero exit status means the ledger rejected the operation; stderr is
//! carried as the reason.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{
  Address, Arg, AttachError, ContractHandle, ContractKind, Deployment, LedgerError, Receipt, RemoteLedger,
};

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
  Deploy {
    kind: &'a ContractKind,
    args: &'a [Arg],
  },
  Attach {
    kind: &'a ContractKind,
    address: &'a Address,
  },
  Call {
    kind: &'a ContractKind,
    address: &'a Address,
    method: &'a str,
    args: &'a [Arg],
  },
  Send {
    kind: &'a ContractKind,
    address: &'a Address,
    method: &'a str,
    args: &'a [Arg],
  },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum AttachResponse {
  Ok,
  NotDeployed,
  KindMismatch { found: ContractKind },
}

enum Failure {
  Spawn(String),
  Exit { code: Option<i32>, stderr: String },
}

/// Runs `program args...` once per ledger operation.
#[derive(Debug, Clone)]
pub struct CommandLedger {
  program: String,
  args: Vec<String>,
}

impl CommandLedger {
  pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      args,
    }
  }

  async fn invoke(&self, request: &Request<'_>) -> Result<String, Failure> {
    let payload = serde_json::to_vec(request).map_err(|e| Failure::Spawn(e.to_string()))?;

    debug!(program = %self.program, "spawning ledger command");
    let mut child = Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| Failure::Spawn(format!("{}: {}", self.program, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin
        .write_all(&payload)
        .await
        .map_err(|e| Failure::Spawn(format!("writing request: {}", e)))?;
      // Dropping stdin closes the pipe so the program sees EOF.
    }

    let output = child
      .wait_with_output()
      .await
      .map_err(|e| Failure::Spawn(format!("waiting for {}: {}", self.program, e)))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "ledger command stderr");
      }
      return Err(Failure::Exit {
        code: output.status.code(),
        stderr,
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  async fn request<T: for<'de> Deserialize<'de>>(&self, request: &Request<'_>) -> Result<T, LedgerError> {
    let stdout = self.invoke(request).await.map_err(|failure| match failure {
      Failure::Spawn(message) => LedgerError::Transport { message },
      Failure::Exit { code, stderr } => LedgerError::Rejected {
        reason: if stderr.is_empty() {
          format!("{} exited with {:?}", self.program, code)
        } else {
          stderr
        },
      },
    })?;

    serde_json::from_str(&stdout).map_err(|e| LedgerError::Malformed {
      message: format!("{}: {:?}", e, stdout),
    })
  }
}

#[async_trait]
impl RemoteLedger for CommandLedger {
  fn name(&self) -> &str {
    &self.program
  }

  async fn deploy(&self, kind: &ContractKind, args: &[Arg]) -> Result<Deployment, LedgerError> {
    let deployment: Deployment = self.request(&Request::Deploy { kind, args }).await?;
    info!(kind = %kind, address = %deployment.address, tx = %deployment.tx_hash, "deployment confirmed");
    Ok(deployment)
  }

  async fn attach(&self, kind: &ContractKind, address: &Address) -> Result<ContractHandle, AttachError> {
    let unreachable = |message: String| AttachError::Unreachable {
      address: address.clone(),
      message,
    };

    // Any failure to get a clear answer is ambiguous, never proof of absence.
    let stdout = self
      .invoke(&Request::Attach { kind, address })
      .await
      .map_err(|failure| match failure {
        Failure::Spawn(message) => unreachable(message),
        Failure::Exit { code, stderr } => unreachable(format!("exit {:?}: {}", code, stderr)),
      })?;
    let response: AttachResponse =
      serde_json::from_str(&stdout).map_err(|e| unreachable(format!("malformed response: {}", e)))?;

    match response {
      AttachResponse::Ok => Ok(ContractHandle {
        kind: kind.clone(),
        address: address.clone(),
      }),
      AttachResponse::NotDeployed => Err(AttachError::NotDeployed {
        address: address.clone(),
      }),
      AttachResponse::KindMismatch { found } => Err(AttachError::KindMismatch {
        address: address.clone(),
        expected: kind.clone(),
        found,
      }),
    }
  }

  async fn call(&self, handle: &ContractHandle, method: &str, args: &[Arg]) -> Result<serde_json::Value, LedgerError> {
    self
      .request(&Request::Call {
        kind: &handle.kind,
        address: &handle.address,
        method,
        args,
      })
      .await
  }

  async fn send(&self, handle: &ContractHandle, method: &str, args: &[Arg]) -> Result<Receipt, LedgerError> {
    let receipt: Receipt = self
      .request(&Request::Send {
        kind: &handle.kind,
        address: &handle.address,
        method,
        args,
      })
      .await?;
    info!(address = %handle.address, method, tx = %receipt.tx_hash, "transaction confirmed");
    Ok(receipt)
  }
}
