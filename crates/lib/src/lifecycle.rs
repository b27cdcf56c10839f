//! Flush-on-exit wrapper around a run.
//!
//! [`LifecycleGuard`] owns the step record for the duration of a run. However
//! the run ends (the work finishes, the work fails, or a shutdown signal
//! arrives first), the record is persisted exactly once before control returns
//! to the caller. A panic unwinding through the guard flushes from `Drop`.
//!
//! A signal does not wait for the in-flight step. Its future is dropped, so a
//! transaction already submitted may still land on the ledger; the step was
//! never recorded and runs again (idempotently) next time.

use std::fmt;
use std::future::Future;

use tracing::{error, info, warn};

use crate::store::{StepRecord, StepStorage, StoreError};

/// An external request to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
  /// Ctrl-C / SIGINT.
  Interrupt,
  /// SIGTERM.
  Terminate,
}

impl fmt::Display for ShutdownSignal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShutdownSignal::Interrupt => write!(f, "SIGINT"),
      ShutdownSignal::Terminate => write!(f, "SIGTERM"),
    }
  }
}

/// How the guarded work ended.
#[derive(Debug)]
pub enum Exit<T, E> {
  Completed(T),
  Failed(E),
  Interrupted(ShutdownSignal),
}

/// The work's outcome together with the result of the single flush.
#[derive(Debug)]
pub struct RunOutcome<T, E> {
  pub exit: Exit<T, E>,
  pub flush: Result<(), StoreError>,
}

impl<T, E> RunOutcome<T, E> {
  /// True only when the work completed and its record reached storage.
  pub fn is_success(&self) -> bool {
    matches!(self.exit, Exit::Completed(_)) && self.flush.is_ok()
  }

  /// Process exit status: 0 on success, 1 otherwise.
  pub fn exit_code(&self) -> u8 {
    if self.is_success() { 0 } else { 1 }
  }
}

/// Holds the loaded record and guarantees it is flushed once.
pub struct LifecycleGuard<S: StepStorage> {
  storage: S,
  record: StepRecord,
  flushed: bool,
}

impl<S: StepStorage> LifecycleGuard<S> {
  /// Load the record from `storage`.
  pub fn open(storage: S) -> Result<Self, StoreError> {
    let record = storage.load()?;
    info!(location = %storage.location(), entries = record.len(), "step record opened");
    Ok(Self {
      storage,
      record,
      flushed: false,
    })
  }

  pub fn record(&self) -> &StepRecord {
    &self.record
  }

  /// Run `work` against the record until it finishes or `shutdown` resolves,
  /// then flush.
  ///
  /// `shutdown` is polled first, so a signal that is already pending wins over
  /// work that would also be ready.
  pub async fn run<T, E, F>(mut self, shutdown: impl Future<Output = ShutdownSignal>, work: F) -> RunOutcome<T, E>
  where
    F: AsyncFnOnce(&mut StepRecord) -> Result<T, E>,
  {
    let exit = {
      let work = work(&mut self.record);
      tokio::pin!(work);
      tokio::pin!(shutdown);

      tokio::select! {
        biased;
        signal = &mut shutdown => {
          warn!(%signal, "shutdown requested, abandoning in-flight step");
          Exit::Interrupted(signal)
        }
        result = &mut work => match result {
          Ok(value) => Exit::Completed(value),
          Err(err) => Exit::Failed(err),
        },
      }
    };

    let flush = self.flush();
    RunOutcome { exit, flush }
  }

  fn flush(&mut self) -> Result<(), StoreError> {
    self.flushed = true;
    match self.storage.persist(&self.record) {
      Ok(()) => {
        info!(location = %self.storage.location(), entries = self.record.len(), "step record flushed");
        Ok(())
      }
      Err(err) => {
        error!(location = %self.storage.location(), error = %err, "failed to flush step record, progress from this run is lost");
        Err(err)
      }
    }
  }
}

impl<S: StepStorage> Drop for LifecycleGuard<S> {
  fn drop(&mut self) {
    if !self.flushed {
      let _ = self.flush();
    }
  }
}

/// Resolve on the first Ctrl-C, or SIGTERM on unix.
///
/// A handler that cannot be installed never fires.
pub async fn shutdown_signal() -> ShutdownSignal {
  let interrupt = async {
    match tokio::signal::ctrl_c().await {
      Ok(()) => ShutdownSignal::Interrupt,
      Err(err) => {
        warn!(error = %err, "could not listen for Ctrl-C");
        std::future::pending().await
      }
    }
  };

  #[cfg(unix)]
  {
    use tokio::signal::unix::{SignalKind, signal};

    let terminate = async {
      match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
          stream.recv().await;
          ShutdownSignal::Terminate
        }
        Err(err) => {
          warn!(error = %err, "could not listen for SIGTERM");
          std::future::pending().await
        }
      }
    };

    tokio::select! {
      signal = interrupt => signal,
      signal = terminate => signal,
    }
  }

  #[cfg(not(unix))]
  {
    interrupt.await
  }
}
