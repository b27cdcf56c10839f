//! ironstep-lib: resumable deployment orchestration for the IRON protocol.
//!
//! This crate provides the pieces `ironstep deploy` is assembled from:
//! - `store`: the persisted step record (what has already happened)
//! - `ledger`: the remote ledger capability and its backends
//! - `step`: the create-or-fetch, execute-once and verification primitives
//! - `plan`/`execute`: the static protocol step graph and its driver
//! - `lifecycle`: guaranteed flush of the step record on every exit path

pub mod config;
pub mod consts;
pub mod execute;
pub mod init;
pub mod ledger;
pub mod lifecycle;
pub mod plan;
pub mod platform;
pub mod step;
pub mod store;
pub mod store_lock;
