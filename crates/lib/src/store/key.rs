//! Typed keys for the flat step record namespace.
//!
//! Three key families share one namespace:
//!
//! ```text
//! Treasury                -> deployed address
//! task.treasury.addPool   -> serialized task outcome
//! verify-Treasury         -> serialized constructor arguments
//! ```

use std::fmt;

use crate::consts::{TASK_KEY_PREFIX, VERIFY_KEY_PREFIX};

/// A key in the step record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepKey {
  /// Address of a deployed resource.
  Resource(String),
  /// Result of a one-time task.
  Task(String),
  /// Verification arguments recorded for a resource.
  Verify(String),
}

impl StepKey {
  pub fn resource(name: impl Into<String>) -> Self {
    StepKey::Resource(name.into())
  }

  pub fn task(name: impl Into<String>) -> Self {
    StepKey::Task(name.into())
  }

  pub fn verify(name: impl Into<String>) -> Self {
    StepKey::Verify(name.into())
  }

  /// Parse a raw key into its family.
  ///
  /// Anything without a family prefix is a resource name.
  pub fn parse(raw: &str) -> Self {
    if let Some(name) = raw.strip_prefix(TASK_KEY_PREFIX) {
      StepKey::Task(name.to_string())
    } else if let Some(name) = raw.strip_prefix(VERIFY_KEY_PREFIX) {
      StepKey::Verify(name.to_string())
    } else {
      StepKey::Resource(raw.to_string())
    }
  }

  /// The logical name without the family prefix.
  pub fn name(&self) -> &str {
    match self {
      StepKey::Resource(name) | StepKey::Task(name) | StepKey::Verify(name) => name,
    }
  }

  /// Whether `name` would be misread as another family when used as a resource name.
  pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(TASK_KEY_PREFIX) || name.starts_with(VERIFY_KEY_PREFIX)
  }
}

impl fmt::Display for StepKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StepKey::Resource(name) => write!(f, "{}", name),
      StepKey::Task(name) => write!(f, "{}{}", TASK_KEY_PREFIX, name),
      StepKey::Verify(name) => write!(f, "{}{}", VERIFY_KEY_PREFIX, name),
    }
  }
}
