//! reaper-connect
//!
//! Amazon Connect implementation of the deletion engine's provider
//! contract, plus the setup calls a front end needs before a run:
//! credential resolution, caller identity, and instance listing.
//!
//! SDK errors are classified by error code into the engine's
//! not-found, transient, and permanent classes.

pub mod credentials;
mod delete;
mod discovery;
pub mod error;
mod field;
pub mod instances;
pub mod provider;

pub use crate::credentials::{
    CallerIdentity, CredentialSource, build_sdk_config, redact_access_key, validate_credentials,
};
pub use crate::error::{ConnectError, classify_code};
pub use crate::instances::{InstanceSummary, list_instances, list_instances_in};
pub use crate::provider::ConnectProvider;
