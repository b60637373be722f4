use aws_sdk_connect::Client;
use reaper_core::{BoxFuture, ProviderError, ResourceProvider, ResourceRef};

use crate::{delete, discovery};

/// Amazon Connect behind the [`ResourceProvider`] contract.
///
/// One provider is bound to one region and one set of credentials, so
/// every call of a run carries the same caller identity.
pub struct ConnectProvider {
    client: Client,
    caller: Option<String>,
}

impl ConnectProvider {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
            caller: None,
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            caller: None,
        }
    }

    /// Caller ARN recorded with each run planned through this provider.
    pub fn with_caller(mut self, arn: impl Into<String>) -> Self {
        self.caller = Some(arn.into());
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl ResourceProvider for ConnectProvider {
    fn list_dependents<'a>(
        &'a self,
        target: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<ResourceRef>, ProviderError>> {
        Box::pin(discovery::dependents(&self.client, target))
    }

    fn delete<'a>(&'a self, target: &'a ResourceRef) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(delete::delete(&self.client, target))
    }

    fn caller_identity(&self) -> Option<String> {
        self.caller.clone()
    }
}
