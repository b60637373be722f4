use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderError;
use crate::resource::ResourceRef;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remote side of a deletion run.
///
/// One impl per backend (Amazon Connect, test doubles). Methods return
/// boxed futures for dyn compatibility. Every call made through one
/// provider value must carry the same caller identity.
pub trait ResourceProvider: Send + Sync {
    /// Enumerate concrete resources that reference `target`.
    fn list_dependents<'a>(
        &'a self,
        target: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<ResourceRef>, ProviderError>>;

    /// Delete `target`. `ProviderError::NotFound` means it is already gone.
    fn delete<'a>(&'a self, target: &'a ResourceRef) -> BoxFuture<'a, Result<(), ProviderError>>;

    /// Opaque identity of the caller, recorded in the ledger at plan time.
    fn caller_identity(&self) -> Option<String> {
        None
    }
}
