//! Create-or-fetch resource step.

use std::future::Future;

use tracing::{info, warn};

use super::{AttachPolicy, StepError, Steps};
use crate::ledger::{Address, Arg, AttachError, ContractHandle, ContractKind, Deployment, LedgerError, RemoteLedger};
use crate::store::StepKey;

/// How [`Steps::ensure`] obtained its handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
  /// The recorded address resolved; no transaction was submitted.
  Attached,
  /// A new instance was deployed. `replaced` is the stale recorded value, if any.
  Deployed { replaced: Option<String> },
}

impl Origin {
  pub fn is_deployed(&self) -> bool {
    matches!(self, Origin::Deployed { .. })
  }
}

impl<'a, L: RemoteLedger + ?Sized> Steps<'a, L> {
  /// Return a handle to `name`, deploying it with `deploy` only if the
  /// recorded address is absent or no longer resolves.
  pub async fn ensure<F, Fut>(
    &mut self,
    name: &str,
    kind: &ContractKind,
    deploy: F,
  ) -> Result<(ContractHandle, Origin), StepError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Deployment, LedgerError>>,
  {
    let key = StepKey::resource(name);
    let recorded = self.record.get(&key).map(str::to_string);

    if let Some(recorded) = &recorded {
      match self.attach_recorded(kind, recorded).await {
        Ok(handle) => {
          info!(resource = name, address = %handle.address, "attached");
          return Ok((handle, Origin::Attached));
        }
        Err(source) if !source.is_definitive() && self.policy == AttachPolicy::Strict => {
          return Err(StepError::AmbiguousAttach {
            name: name.to_string(),
            address: recorded.clone(),
            source,
          });
        }
        Err(e) => {
          warn!(resource = name, address = %recorded, error = %e, "recorded address does not resolve, redeploying");
        }
      }
    }

    info!(resource = name, kind = %kind, "deploying");
    let deployment = deploy().await.map_err(|source| StepError::Execution {
      step: name.to_string(),
      source,
    })?;

    self.record.set(key, deployment.address.to_string());
    info!(resource = name, address = %deployment.address, tx = %deployment.tx_hash, "deployed");

    Ok((deployment.into_handle(kind.clone()), Origin::Deployed { replaced: recorded }))
  }

  /// [`Steps::ensure`] with a plain ledger deployment of `kind(args)`.
  ///
  /// Verification arguments are recorded when the resource is deployed.
  pub async fn resource(
    &mut self,
    name: &str,
    kind: &ContractKind,
    args: &[Arg],
  ) -> Result<(ContractHandle, Origin), StepError> {
    let ledger = self.ledger;
    let (handle, origin) = self.ensure(name, kind, || ledger.deploy(kind, args)).await?;
    if origin.is_deployed() {
      self.record_verification(name, args);
    }
    Ok((handle, origin))
  }

  /// Attach to a configured address and pin it in the record.
  ///
  /// Returns the previously pinned address when configuration has moved
  /// `name` somewhere else since the last run.
  pub async fn external(
    &mut self,
    name: &str,
    kind: &ContractKind,
    address: &Address,
  ) -> Result<(ContractHandle, Option<String>), StepError> {
    let handle = self
      .ledger
      .attach(kind, address)
      .await
      .map_err(|source| StepError::External {
        name: name.to_string(),
        source,
      })?;

    let pinned = address.to_string();
    let previous = self
      .record
      .set(StepKey::resource(name), pinned.clone())
      .filter(|previous| *previous != pinned);
    match &previous {
      Some(previous) => warn!(external = name, previous = %previous, address = %address, "external address changed"),
      None => info!(external = name, address = %address, "attached"),
    }
    Ok((handle, previous))
  }

  async fn attach_recorded(&self, kind: &ContractKind, recorded: &str) -> Result<ContractHandle, AttachError> {
    let address = Address::parse(recorded).map_err(|_| AttachError::InvalidAddress(recorded.to_string()))?;
    self.ledger.attach(kind, &address).await
  }
}
