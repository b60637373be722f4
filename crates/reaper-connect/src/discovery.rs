use aws_sdk_connect::Client;
use aws_sdk_connect::types::{ListFlowAssociationResourceType, QueueType};
use reaper_core::{ErrorClass, ProviderError, ResourceKind, ResourceRef};

use crate::error::classify;
use crate::field::{Field, arn_resource_id};

/// Collect one id field from every page of a list call.
macro_rules! paged_ids {
    ($operation:literal, $request:expr, $list:ident, $id:ident) => {{
        let mut ids: Vec<String> = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let resp = $request
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| classify($operation, e))?;
            ids.extend(
                resp.$list()
                    .iter()
                    .filter_map(|item| item.$id().value())
                    .map(str::to_string),
            );
            match resp.next_token().value() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        ids
    }};
}

struct QueueLinks {
    id: String,
    hours_of_operation_id: Option<String>,
    outbound_flow_id: Option<String>,
}

struct UserLinks {
    id: String,
    routing_profile_id: Option<String>,
    security_profile_ids: Vec<String>,
}

struct QuickConnectLinks {
    id: String,
    user_id: Option<String>,
    queue_id: Option<String>,
    flow_id: Option<String>,
}

/// Concrete resources in `target`'s instance that reference `target`.
pub(crate) async fn dependents(
    client: &Client,
    target: &ResourceRef,
) -> Result<Vec<ResourceRef>, ProviderError> {
    let instance = target.instance_id.as_str();
    let id = target.id.as_str();
    let refs = |kind: ResourceKind, ids: Vec<String>| -> Vec<ResourceRef> {
        ids.into_iter()
            .map(|id| ResourceRef::new(kind, instance, id))
            .collect()
    };

    let found = match target.kind {
        ResourceKind::Instance => {
            let mut all = Vec::new();
            all.extend(refs(ResourceKind::Flow, flow_ids(client, instance).await?));
            all.extend(refs(
                ResourceKind::HoursOfOperation,
                hours_of_operation_ids(client, instance).await?,
            ));
            all.extend(refs(
                ResourceKind::PhoneNumberAssociation,
                phone_number_ids(client, instance).await?,
            ));
            all.extend(refs(ResourceKind::Queue, queue_ids(client, instance).await?));
            all.extend(refs(
                ResourceKind::QuickConnect,
                quick_connect_ids(client, instance).await?,
            ));
            all.extend(refs(
                ResourceKind::RoutingProfile,
                routing_profile_ids(client, instance).await?,
            ));
            all.extend(refs(
                ResourceKind::SecurityProfile,
                security_profile_ids(client, instance).await?,
            ));
            all.extend(refs(ResourceKind::User, user_ids(client, instance).await?));
            all
        }
        ResourceKind::Flow => {
            let mut all = Vec::new();
            let queues = queues(client, instance)
                .await?
                .into_iter()
                .filter(|q| q.outbound_flow_id.as_deref() == Some(id))
                .map(|q| q.id)
                .collect();
            all.extend(refs(ResourceKind::Queue, queues));
            let quick_connects = quick_connects(client, instance)
                .await?
                .into_iter()
                .filter(|qc| qc.flow_id.as_deref() == Some(id))
                .map(|qc| qc.id)
                .collect();
            all.extend(refs(ResourceKind::QuickConnect, quick_connects));
            all.extend(refs(
                ResourceKind::PhoneNumberAssociation,
                flow_phone_numbers(client, instance, id).await?,
            ));
            all
        }
        ResourceKind::HoursOfOperation => {
            let queues = queues(client, instance)
                .await?
                .into_iter()
                .filter(|q| q.hours_of_operation_id.as_deref() == Some(id))
                .map(|q| q.id)
                .collect();
            refs(ResourceKind::Queue, queues)
        }
        ResourceKind::Queue => {
            let mut profiles = Vec::new();
            for profile in routing_profile_ids(client, instance).await? {
                if routing_profile_queue_ids(client, instance, &profile)
                    .await?
                    .iter()
                    .any(|q| q == id)
                {
                    profiles.push(profile);
                }
            }
            let mut all = refs(ResourceKind::RoutingProfile, profiles);
            let quick_connects = quick_connects(client, instance)
                .await?
                .into_iter()
                .filter(|qc| qc.queue_id.as_deref() == Some(id))
                .map(|qc| qc.id)
                .collect();
            all.extend(refs(ResourceKind::QuickConnect, quick_connects));
            all
        }
        ResourceKind::RoutingProfile => {
            let users = users(client, instance)
                .await?
                .into_iter()
                .filter(|u| u.routing_profile_id.as_deref() == Some(id))
                .map(|u| u.id)
                .collect();
            refs(ResourceKind::User, users)
        }
        ResourceKind::SecurityProfile => {
            let users = users(client, instance)
                .await?
                .into_iter()
                .filter(|u| u.security_profile_ids.iter().any(|sp| sp == id))
                .map(|u| u.id)
                .collect();
            refs(ResourceKind::User, users)
        }
        ResourceKind::User => {
            let quick_connects = quick_connects(client, instance)
                .await?
                .into_iter()
                .filter(|qc| qc.user_id.as_deref() == Some(id))
                .map(|qc| qc.id)
                .collect();
            refs(ResourceKind::QuickConnect, quick_connects)
        }
        ResourceKind::QuickConnect | ResourceKind::PhoneNumberAssociation => Vec::new(),
    };

    tracing::debug!(resource = %target, found = found.len(), "listed dependents");
    Ok(found)
}

async fn flow_ids(client: &Client, instance: &str) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListContactFlows",
        client.list_contact_flows().instance_id(instance),
        contact_flow_summary_list,
        id
    ))
}

async fn hours_of_operation_ids(
    client: &Client,
    instance: &str,
) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListHoursOfOperations",
        client.list_hours_of_operations().instance_id(instance),
        hours_of_operation_summary_list,
        id
    ))
}

async fn phone_number_ids(client: &Client, instance: &str) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListPhoneNumbers",
        client.list_phone_numbers().instance_id(instance),
        phone_number_summary_list,
        id
    ))
}

/// Standard queues only; agent queues go away with their user.
async fn queue_ids(client: &Client, instance: &str) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListQueues",
        client
            .list_queues()
            .instance_id(instance)
            .queue_types(QueueType::Standard),
        queue_summary_list,
        id
    ))
}

async fn quick_connect_ids(client: &Client, instance: &str) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListQuickConnects",
        client.list_quick_connects().instance_id(instance),
        quick_connect_summary_list,
        id
    ))
}

async fn routing_profile_ids(
    client: &Client,
    instance: &str,
) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListRoutingProfiles",
        client.list_routing_profiles().instance_id(instance),
        routing_profile_summary_list,
        id
    ))
}

async fn routing_profile_queue_ids(
    client: &Client,
    instance: &str,
    routing_profile: &str,
) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListRoutingProfileQueues",
        client
            .list_routing_profile_queues()
            .instance_id(instance)
            .routing_profile_id(routing_profile),
        routing_profile_queue_config_summary_list,
        queue_id
    ))
}

async fn security_profile_ids(
    client: &Client,
    instance: &str,
) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListSecurityProfiles",
        client.list_security_profiles().instance_id(instance),
        security_profile_summary_list,
        id
    ))
}

async fn user_ids(client: &Client, instance: &str) -> Result<Vec<String>, ProviderError> {
    Ok(paged_ids!(
        "ListUsers",
        client.list_users().instance_id(instance),
        user_summary_list,
        id
    ))
}

/// Phone numbers whose inbound calls are routed to `flow`.
async fn flow_phone_numbers(
    client: &Client,
    instance: &str,
    flow: &str,
) -> Result<Vec<String>, ProviderError> {
    let mut ids = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let resp = client
            .list_flow_associations()
            .instance_id(instance)
            .resource_type(ListFlowAssociationResourceType::VoicePhoneNumber)
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| classify("ListFlowAssociations", e))?;

        for assoc in resp.flow_association_summary_list() {
            if assoc.flow_id().value() != Some(flow) {
                continue;
            }
            if let Some(arn) = assoc.resource_id().value() {
                ids.push(arn_resource_id(arn).to_string());
            }
        }

        match resp.next_token().value() {
            Some(token) => next_token = Some(token.to_string()),
            None => break,
        }
    }
    Ok(ids)
}

/// A describe call that raced with a deletion yields `None`.
fn absent_ok<T>(result: Result<T, ProviderError>) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.class() == ErrorClass::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

async fn queues(client: &Client, instance: &str) -> Result<Vec<QueueLinks>, ProviderError> {
    let mut links = Vec::new();
    for id in queue_ids(client, instance).await? {
        let described = client
            .describe_queue()
            .instance_id(instance)
            .queue_id(&id)
            .send()
            .await
            .map_err(|e| classify("DescribeQueue", e));
        let Some(resp) = absent_ok(described)? else {
            continue;
        };
        let Some(queue) = resp.queue() else {
            continue;
        };
        links.push(QueueLinks {
            hours_of_operation_id: queue.hours_of_operation_id().value().map(str::to_string),
            outbound_flow_id: queue
                .outbound_caller_config()
                .and_then(|c| c.outbound_flow_id().value())
                .map(str::to_string),
            id,
        });
    }
    Ok(links)
}

async fn users(client: &Client, instance: &str) -> Result<Vec<UserLinks>, ProviderError> {
    let mut links = Vec::new();
    for id in user_ids(client, instance).await? {
        let described = client
            .describe_user()
            .instance_id(instance)
            .user_id(&id)
            .send()
            .await
            .map_err(|e| classify("DescribeUser", e));
        let Some(resp) = absent_ok(described)? else {
            continue;
        };
        let Some(user) = resp.user() else {
            continue;
        };
        links.push(UserLinks {
            routing_profile_id: user.routing_profile_id().value().map(str::to_string),
            security_profile_ids: user.security_profile_ids().to_vec(),
            id,
        });
    }
    Ok(links)
}

async fn quick_connects(
    client: &Client,
    instance: &str,
) -> Result<Vec<QuickConnectLinks>, ProviderError> {
    let mut links = Vec::new();
    for id in quick_connect_ids(client, instance).await? {
        let described = client
            .describe_quick_connect()
            .instance_id(instance)
            .quick_connect_id(&id)
            .send()
            .await
            .map_err(|e| classify("DescribeQuickConnect", e));
        let Some(resp) = absent_ok(described)? else {
            continue;
        };
        let Some(config) = resp.quick_connect().and_then(|qc| qc.quick_connect_config()) else {
            continue;
        };

        let mut link = QuickConnectLinks {
            id,
            user_id: None,
            queue_id: None,
            flow_id: None,
        };
        if let Some(user) = config.user_config() {
            link.user_id = user.user_id().value().map(str::to_string);
            link.flow_id = user.contact_flow_id().value().map(str::to_string);
        }
        if let Some(queue) = config.queue_config() {
            link.queue_id = queue.queue_id().value().map(str::to_string);
            link.flow_id = queue.contact_flow_id().value().map(str::to_string);
        }
        links.push(link);
    }
    Ok(links)
}
