use aws_sdk_connect::Client;
use reaper_core::{ProviderError, ResourceKind, ResourceRef};

use crate::error::classify;

/// Issue the one API call that removes `target`.
pub(crate) async fn delete(client: &Client, target: &ResourceRef) -> Result<(), ProviderError> {
    let instance = target.instance_id.as_str();
    let id = target.id.as_str();

    let result = match target.kind {
        ResourceKind::Flow => client
            .delete_contact_flow()
            .instance_id(instance)
            .contact_flow_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("DeleteContactFlow", e)),
        ResourceKind::HoursOfOperation => client
            .delete_hours_of_operation()
            .instance_id(instance)
            .hours_of_operation_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("DeleteHoursOfOperation", e)),
        ResourceKind::Instance => client
            .delete_instance()
            .instance_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("DeleteInstance", e)),
        ResourceKind::PhoneNumberAssociation => client
            .release_phone_number()
            .phone_number_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("ReleasePhoneNumber", e)),
        ResourceKind::Queue => client
            .delete_queue()
            .instance_id(instance)
            .queue_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("DeleteQueue", e)),
        ResourceKind::QuickConnect => client
            .delete_quick_connect()
            .instance_id(instance)
            .quick_connect_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("DeleteQuickConnect", e)),
        ResourceKind::RoutingProfile => client
            .delete_routing_profile()
            .instance_id(instance)
            .routing_profile_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("DeleteRoutingProfile", e)),
        ResourceKind::SecurityProfile => client
            .delete_security_profile()
            .instance_id(instance)
            .security_profile_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("DeleteSecurityProfile", e)),
        ResourceKind::User => client
            .delete_user()
            .instance_id(instance)
            .user_id(id)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify("DeleteUser", e)),
    };

    result.map_err(|e| e.with_resource(target))
}
