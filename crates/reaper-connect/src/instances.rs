use aws_sdk_connect::Client;
use reaper_core::{format_err_chain, regions};
use serde::{Deserialize, Serialize};

use crate::credentials::{CredentialSource, build_sdk_config};
use crate::error::ConnectError;
use crate::field::Field;

/// One Connect instance as shown in the instance picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: String,
    pub alias: Option<String>,
    pub region: String,
    pub arn: Option<String>,
}

impl InstanceSummary {
    /// `id, alias, region (name)` for listings.
    pub fn display_name(&self) -> String {
        format!(
            "{}, {}, {}",
            self.id,
            self.alias.as_deref().unwrap_or("-"),
            regions::display_name(&self.region).unwrap_or_else(|| self.region.clone())
        )
    }
}

/// Instances in one region reachable with `client`.
pub async fn list_instances_in(
    client: &Client,
    region: &str,
) -> Result<Vec<InstanceSummary>, ConnectError> {
    let mut instances = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let resp = client
            .list_instances()
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| {
                ConnectError::Aws(format!("ListInstances in {region}: {}", format_err_chain(&e)))
            })?;

        for summary in resp.instance_summary_list() {
            let Some(id) = summary.id().value() else {
                continue;
            };
            instances.push(InstanceSummary {
                id: id.to_string(),
                alias: summary.instance_alias().value().map(str::to_string),
                region: region.to_string(),
                arn: summary.arn().value().map(str::to_string),
            });
        }

        match resp.next_token().value() {
            Some(token) => next_token = Some(token.to_string()),
            None => break,
        }
    }
    Ok(instances)
}

/// Instances across several regions, each queried with its own client.
pub async fn list_instances(
    region_codes: &[String],
    creds: &CredentialSource,
) -> Result<Vec<InstanceSummary>, ConnectError> {
    let mut all = Vec::new();
    for region in region_codes {
        if !regions::is_supported_region(region) {
            return Err(ConnectError::UnsupportedRegion(region.clone()));
        }
        let config = build_sdk_config(region, creds).await;
        let client = Client::new(&config);
        let found = list_instances_in(&client, region).await?;
        tracing::info!(region = %region, instances = found.len(), "listed Connect instances");
        all.extend(found);
    }
    Ok(all)
}
