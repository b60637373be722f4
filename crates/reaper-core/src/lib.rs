//! reaper-core
//!
//! Shared vocabulary of the Amazon Connect bulk-deletion engine.
//! No AWS SDK dependency: resource identity, the static dependency
//! catalog, provider error classification, and the collaborator trait
//! the engine drives.

pub mod catalog;
pub mod error;
pub mod provider;
pub mod regions;
pub mod resource;

pub use crate::catalog::{DeleteCapability, EdgeDirection, ResourceCatalog};
pub use crate::error::{ErrorClass, ParseRefError, ProviderError, format_err_chain};
pub use crate::provider::{BoxFuture, ResourceProvider};
pub use crate::resource::{ResourceKind, ResourceRef};
