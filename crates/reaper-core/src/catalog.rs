use std::collections::BTreeSet;

use crate::resource::ResourceKind;

/// How one resource kind is enumerated and removed.
///
/// Pure metadata: the provider maps each kind to its API calls, the CLI
/// shows the label, and the IAM action lists aggregate into the policy an
/// operator needs before running a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCapability {
    pub kind: ResourceKind,
    /// Short label for output, e.g. "Routing Profile"
    pub label: &'static str,
    /// The API action that removes one resource of this kind
    pub delete_action: &'static str,
    /// API actions used to find resources that reference this kind
    pub discovery_actions: &'static [&'static str],
}

/// Which side of a discovered relation is deleted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// The discovered resource references the origin and must go first.
    DependentFirst,
    /// The discovered resource is only removed once the origin is gone.
    OriginFirst,
}

/// Process-wide constant table of kinds and their dependency edges.
pub struct ResourceCatalog;

static CAPABILITIES: [DeleteCapability; 9] = [
    DeleteCapability {
        kind: ResourceKind::Flow,
        label: "Flow",
        delete_action: "connect:DeleteContactFlow",
        discovery_actions: &[
            "connect:ListQueues",
            "connect:DescribeQueue",
            "connect:ListQuickConnects",
            "connect:DescribeQuickConnect",
            "connect:ListFlowAssociations",
        ],
    },
    DeleteCapability {
        kind: ResourceKind::HoursOfOperation,
        label: "Hours of Operation",
        delete_action: "connect:DeleteHoursOfOperation",
        discovery_actions: &["connect:ListQueues", "connect:DescribeQueue"],
    },
    DeleteCapability {
        kind: ResourceKind::Instance,
        label: "Instance",
        delete_action: "connect:DeleteInstance",
        discovery_actions: &[
            "connect:ListContactFlows",
            "connect:ListHoursOfOperations",
            "connect:ListPhoneNumbers",
            "connect:ListQueues",
            "connect:ListQuickConnects",
            "connect:ListRoutingProfiles",
            "connect:ListSecurityProfiles",
            "connect:ListUsers",
        ],
    },
    DeleteCapability {
        kind: ResourceKind::PhoneNumberAssociation,
        label: "Phone Number",
        delete_action: "connect:ReleasePhoneNumber",
        discovery_actions: &[],
    },
    DeleteCapability {
        kind: ResourceKind::Queue,
        label: "Queue",
        delete_action: "connect:DeleteQueue",
        discovery_actions: &[
            "connect:ListRoutingProfiles",
            "connect:ListRoutingProfileQueues",
            "connect:ListQuickConnects",
            "connect:DescribeQuickConnect",
        ],
    },
    DeleteCapability {
        kind: ResourceKind::QuickConnect,
        label: "Quick Connect",
        delete_action: "connect:DeleteQuickConnect",
        discovery_actions: &[],
    },
    DeleteCapability {
        kind: ResourceKind::RoutingProfile,
        label: "Routing Profile",
        delete_action: "connect:DeleteRoutingProfile",
        discovery_actions: &["connect:ListUsers", "connect:DescribeUser"],
    },
    DeleteCapability {
        kind: ResourceKind::SecurityProfile,
        label: "Security Profile",
        delete_action: "connect:DeleteSecurityProfile",
        discovery_actions: &["connect:ListUsers", "connect:DescribeUser"],
    },
    DeleteCapability {
        kind: ResourceKind::User,
        label: "User",
        delete_action: "connect:DeleteUser",
        discovery_actions: &["connect:ListQuickConnects", "connect:DescribeQuickConnect"],
    },
];

impl ResourceCatalog {
    /// Kinds whose resources reference `kind` and so must be deleted
    /// before a resource of `kind` can be removed.
    pub fn edges_for(kind: ResourceKind) -> &'static [ResourceKind] {
        match kind {
            ResourceKind::Instance => &[
                ResourceKind::Flow,
                ResourceKind::HoursOfOperation,
                ResourceKind::PhoneNumberAssociation,
                ResourceKind::Queue,
                ResourceKind::QuickConnect,
                ResourceKind::RoutingProfile,
                ResourceKind::SecurityProfile,
                ResourceKind::User,
            ],
            ResourceKind::Flow => &[ResourceKind::Queue, ResourceKind::QuickConnect],
            ResourceKind::HoursOfOperation => &[ResourceKind::Queue],
            ResourceKind::Queue => &[ResourceKind::QuickConnect, ResourceKind::RoutingProfile],
            ResourceKind::RoutingProfile => &[ResourceKind::User],
            ResourceKind::SecurityProfile => &[ResourceKind::User],
            ResourceKind::User => &[ResourceKind::QuickConnect],
            ResourceKind::QuickConnect | ResourceKind::PhoneNumberAssociation => &[],
        }
    }

    /// Kinds discovered from `kind` that are removed only after the
    /// resource of `kind` has been deleted.
    ///
    /// A claimed phone number routed to a flow is released only once that
    /// flow is gone; if the flow cannot be deleted the number stays claimed.
    pub fn trailing_for(kind: ResourceKind) -> &'static [ResourceKind] {
        match kind {
            ResourceKind::Flow => &[ResourceKind::PhoneNumberAssociation],
            _ => &[],
        }
    }

    /// Whether discovery from `origin` may legitimately turn up a resource
    /// of `discovered` kind.
    pub fn declares(origin: ResourceKind, discovered: ResourceKind) -> bool {
        Self::edges_for(origin).contains(&discovered)
            || Self::trailing_for(origin).contains(&discovered)
    }

    pub fn order(origin: ResourceKind, discovered: ResourceKind) -> EdgeDirection {
        if Self::trailing_for(origin).contains(&discovered) {
            EdgeDirection::OriginFirst
        } else {
            EdgeDirection::DependentFirst
        }
    }

    pub fn capability_for(kind: ResourceKind) -> &'static DeleteCapability {
        // CAPABILITIES is declared in ResourceKind discriminant order.
        &CAPABILITIES[kind as usize]
    }

    /// Every IAM action a full deletion run may need.
    pub fn required_actions() -> BTreeSet<&'static str> {
        CAPABILITIES
            .iter()
            .flat_map(|c| {
                std::iter::once(c.delete_action).chain(c.discovery_actions.iter().copied())
            })
            .collect()
    }
}
