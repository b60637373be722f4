use std::collections::{HashMap, HashSet};

use reaper_core::{EdgeDirection, ResourceCatalog, ResourceKind};

/// Kind-level "must be deleted before" graph, trailing relations included.
fn kind_graph() -> HashMap<ResourceKind, Vec<ResourceKind>> {
    let mut before: HashMap<ResourceKind, Vec<ResourceKind>> = HashMap::new();
    for kind in ResourceKind::ALL {
        for dependent in ResourceCatalog::edges_for(kind) {
            // dependent must be deleted before kind
            before.entry(kind).or_default().push(*dependent);
        }
        for trailing in ResourceCatalog::trailing_for(kind) {
            // kind must be deleted before trailing
            before.entry(*trailing).or_default().push(kind);
        }
    }
    before
}

fn reaches(
    graph: &HashMap<ResourceKind, Vec<ResourceKind>>,
    from: ResourceKind,
    to: ResourceKind,
    seen: &mut HashSet<ResourceKind>,
) -> bool {
    if !seen.insert(from) {
        return false;
    }
    graph.get(&from).into_iter().flatten().any(|next| {
        *next == to || reaches(graph, *next, to, seen)
    })
}

#[test]
fn kind_level_graph_is_acyclic() {
    let graph = kind_graph();
    for kind in ResourceKind::ALL {
        assert!(
            !reaches(&graph, kind, kind, &mut HashSet::new()),
            "{kind} participates in a kind-level cycle"
        );
    }
}

#[test]
fn every_kind_has_a_capability() {
    for kind in ResourceKind::ALL {
        let cap = ResourceCatalog::capability_for(kind);
        assert_eq!(cap.kind, kind);
        assert!(cap.delete_action.starts_with("connect:"));
    }
}

#[test]
fn users_block_routing_profiles_which_block_queues() {
    assert!(ResourceCatalog::edges_for(ResourceKind::Queue).contains(&ResourceKind::RoutingProfile));
    assert!(ResourceCatalog::edges_for(ResourceKind::RoutingProfile).contains(&ResourceKind::User));
    assert_eq!(
        ResourceCatalog::order(ResourceKind::Queue, ResourceKind::RoutingProfile),
        EdgeDirection::DependentFirst
    );
}

#[test]
fn phone_numbers_trail_their_flow() {
    assert_eq!(
        ResourceCatalog::order(ResourceKind::Flow, ResourceKind::PhoneNumberAssociation),
        EdgeDirection::OriginFirst
    );
    assert_eq!(
        ResourceCatalog::order(ResourceKind::Instance, ResourceKind::PhoneNumberAssociation),
        EdgeDirection::DependentFirst
    );
}

#[test]
fn declared_relations_cover_edges_and_trailing_kinds() {
    assert!(ResourceCatalog::declares(ResourceKind::Queue, ResourceKind::RoutingProfile));
    assert!(ResourceCatalog::declares(ResourceKind::Flow, ResourceKind::PhoneNumberAssociation));
    assert!(!ResourceCatalog::declares(ResourceKind::User, ResourceKind::Queue));
    assert!(!ResourceCatalog::declares(ResourceKind::QuickConnect, ResourceKind::User));
    assert!(!ResourceCatalog::declares(ResourceKind::Queue, ResourceKind::Instance));
}

#[test]
fn instance_is_blocked_by_every_other_kind() {
    let edges = ResourceCatalog::edges_for(ResourceKind::Instance);
    for kind in ResourceKind::ALL {
        if kind != ResourceKind::Instance {
            assert!(edges.contains(&kind), "instance edges missing {kind}");
        }
    }
}

#[test]
fn required_actions_cover_deletes_and_discovery() {
    let actions = ResourceCatalog::required_actions();
    assert!(actions.contains("connect:DeleteQueue"));
    assert!(actions.contains("connect:ReleasePhoneNumber"));
    assert!(actions.contains("connect:DescribeUser"));
}
