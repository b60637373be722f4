mod common;

use std::collections::HashMap;

use common::{FakeConnect, flow, phone, queue, quick_connect, routing_profile, user};
use reaper_core::{ProviderError, ResourceKind, ResourceRef};
use reaper_engine::{DeletionPlan, DependencyGraphBuilder, GraphError, NodeState};
use reaper_ledger::RunId;

async fn build(fake: &FakeConnect, targets: Vec<ResourceRef>) -> Result<DeletionPlan, GraphError> {
    DependencyGraphBuilder::new(fake)
        .build(RunId(1), targets)
        .await
}

fn order(plan: &DeletionPlan) -> Vec<ResourceRef> {
    plan.order().cloned().collect()
}

/// Every dependency appears strictly earlier than the node that needs it.
fn assert_topological(plan: &DeletionPlan) {
    let position: HashMap<&ResourceRef, usize> =
        plan.order().enumerate().map(|(i, r)| (r, i)).collect();
    assert_eq!(position.len(), plan.len(), "every node is ordered exactly once");
    for node in plan.nodes() {
        for dep in &node.dependencies {
            assert!(
                position[dep] < position[&node.resource],
                "{dep} must come before {}",
                node.resource
            );
            assert!(plan.node(dep).unwrap().dependents.contains(&node.resource));
        }
    }
}

#[tokio::test]
async fn referencers_are_ordered_before_what_they_reference() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("Q1"), &routing_profile("RP1"));
    fake.add_dependent(&routing_profile("RP1"), &user("U1"));

    let plan = build(&fake, vec![queue("Q1")]).await.unwrap();

    assert_eq!(
        order(&plan),
        vec![user("U1"), routing_profile("RP1"), queue("Q1")]
    );
    assert_eq!(plan.layers().len(), 3);
    assert!(plan.nodes().all(|n| n.state == NodeState::Pending));
    assert_topological(&plan);
}

#[tokio::test]
async fn phone_numbers_are_released_after_their_flow() {
    let fake = FakeConnect::new();
    fake.add_dependent(&flow("F1"), &phone("P1"));

    let plan = build(&fake, vec![flow("F1")]).await.unwrap();

    assert_eq!(order(&plan), vec![flow("F1"), phone("P1")]);
    let p1 = plan.node(&phone("P1")).unwrap();
    assert!(p1.dependencies.contains(&flow("F1")));
}

#[tokio::test]
async fn layers_break_ties_by_kind_then_id() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("Q1"), &quick_connect("b"));
    fake.add_dependent(&queue("Q1"), &routing_profile("z"));
    fake.add_dependent(&queue("Q1"), &quick_connect("a"));

    let plan = build(&fake, vec![queue("Q1")]).await.unwrap();

    assert_eq!(
        plan.layers()[0],
        vec![quick_connect("a"), quick_connect("b"), routing_profile("z")]
    );
    assert_eq!(plan.layers()[1], vec![queue("Q1")]);
}

#[tokio::test]
async fn repeated_builds_produce_identical_plans() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("Q2"), &routing_profile("RP1"));
    fake.add_dependent(&queue("Q1"), &routing_profile("RP1"));
    fake.add_dependent(&routing_profile("RP1"), &user("U2"));
    fake.add_dependent(&routing_profile("RP1"), &user("U1"));

    let first = build(&fake, vec![queue("Q2"), queue("Q1")]).await.unwrap();
    let second = build(&fake, vec![queue("Q1"), queue("Q2")]).await.unwrap();

    assert_eq!(order(&first), order(&second));
    assert_eq!(first.to_snapshot(), second.to_snapshot());
    assert_topological(&first);
}

#[tokio::test]
async fn shared_dependents_are_planned_once() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("Q1"), &routing_profile("RP1"));
    fake.add_dependent(&queue("Q2"), &routing_profile("RP1"));

    let plan = build(&fake, vec![queue("Q1"), queue("Q2"), queue("Q1")])
        .await
        .unwrap();

    assert_eq!(plan.len(), 3);
    let rp = plan.node(&routing_profile("RP1")).unwrap();
    assert_eq!(rp.dependents.len(), 2);
}

#[tokio::test]
async fn mutual_references_are_rejected_as_a_cycle() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("A"), &routing_profile("B"));
    fake.add_dependent(&routing_profile("B"), &queue("A"));

    let err = build(&fake, vec![queue("A")]).await.unwrap_err();

    match err {
        GraphError::CycleDetected { involved } => {
            assert!(involved.contains(&queue("A")));
            assert!(involved.contains(&routing_profile("B")));
        }
        other => panic!("expected a cycle, got {other}"),
    }
}

#[tokio::test]
async fn self_reference_is_a_cycle() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("A"), &queue("A"));

    let err = build(&fake, vec![queue("A")]).await.unwrap_err();
    assert!(matches!(err, GraphError::CycleDetected { .. }));
}

#[tokio::test]
async fn discovery_failure_aborts_planning() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("Q1"), &routing_profile("RP1"));
    fake.fail_discovery(&routing_profile("RP1"));

    let err = build(&fake, vec![queue("Q1")]).await.unwrap_err();

    match err {
        GraphError::DiscoveryFailed { resource, source } => {
            assert_eq!(resource, routing_profile("RP1"));
            assert!(matches!(source, ProviderError::Transient { .. }));
        }
        other => panic!("expected discovery failure, got {other}"),
    }
    assert!(fake.deletes().is_empty());
}

#[tokio::test]
async fn dependents_from_another_instance_are_rejected() {
    let fake = FakeConnect::new();
    let foreign = ResourceRef::new(ResourceKind::RoutingProfile, "inst-2", "RP9");
    fake.add_dependent(&queue("Q1"), &foreign);

    let err = build(&fake, vec![queue("Q1")]).await.unwrap_err();
    assert!(matches!(err, GraphError::CrossInstance { dependent, .. } if dependent == foreign));
}

#[tokio::test]
async fn dependents_of_an_unexpected_kind_are_rejected() {
    let fake = FakeConnect::new();
    fake.add_dependent(&user("U1"), &queue("Q9"));

    let err = build(&fake, vec![user("U1")]).await.unwrap_err();

    match err {
        GraphError::UndeclaredDependency { origin, dependent } => {
            assert_eq!(origin, user("U1"));
            assert_eq!(dependent, queue("Q9"));
        }
        other => panic!("expected an undeclared dependency, got {other}"),
    }
}

#[tokio::test]
async fn unexpected_kinds_deep_in_discovery_fail_the_whole_build() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("Q1"), &routing_profile("RP1"));
    fake.add_dependent(&routing_profile("RP1"), &quick_connect("QC1"));

    let err = build(&fake, vec![queue("Q1")]).await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::UndeclaredDependency { ref origin, .. } if *origin == routing_profile("RP1")
    ));
}

#[tokio::test]
async fn empty_target_set_builds_an_empty_plan() {
    let fake = FakeConnect::new();
    let plan = build(&fake, vec![]).await.unwrap();
    assert!(plan.is_empty());
    assert!(plan.layers().is_empty());
    assert!(plan.all_terminal());
}

#[tokio::test]
async fn snapshot_rebuilds_the_same_plan() {
    let fake = FakeConnect::new();
    fake.add_dependent(&queue("Q1"), &routing_profile("RP1"));
    fake.add_dependent(&routing_profile("RP1"), &user("U1"));
    fake.add_dependent(&flow("F1"), &phone("P1"));

    let plan = build(&fake, vec![queue("Q1"), flow("F1")]).await.unwrap();
    let rebuilt = DeletionPlan::from_snapshot(RunId(1), &plan.to_snapshot()).unwrap();

    assert_eq!(order(&rebuilt), order(&plan));
    assert_eq!(rebuilt.layers(), plan.layers());
}

#[test]
fn snapshot_with_unknown_dependency_is_rejected() {
    let snapshot = reaper_ledger::PlanSnapshot {
        nodes: vec![reaper_ledger::PlannedNode {
            resource: queue("Q1"),
            dependencies: vec![user("ghost")],
        }],
    };
    let err = DeletionPlan::from_snapshot(RunId(1), &snapshot).unwrap_err();
    assert!(matches!(err, GraphError::DanglingDependency { missing } if missing == user("ghost")));
}

#[test]
fn node_states_only_move_forward() {
    use NodeState::*;
    assert!(Pending.can_transition_to(Ready));
    assert!(Ready.can_transition_to(Running));
    assert!(Running.can_transition_to(Succeeded));
    assert!(Running.can_transition_to(Failed));
    assert!(Pending.can_transition_to(Skipped));
    assert!(Ready.can_transition_to(Skipped));

    assert!(!Running.can_transition_to(Skipped));
    assert!(!Succeeded.can_transition_to(Failed));
    assert!(!Failed.can_transition_to(Ready));
    assert!(!Pending.can_transition_to(Running));
    assert!(!Skipped.can_transition_to(Pending));
}

#[tokio::test]
async fn illegal_transitions_are_reported() {
    let fake = FakeConnect::new();
    let mut plan = build(&fake, vec![queue("Q1")]).await.unwrap();

    let err = plan.transition(&queue("Q1"), NodeState::Succeeded).unwrap_err();
    assert!(err.to_string().contains("pending -> succeeded"));

    assert_eq!(
        plan.transition(&queue("Q1"), NodeState::Ready).unwrap(),
        NodeState::Pending
    );
    assert_eq!(plan.state_of(&queue("Q1")), Some(NodeState::Ready));
    assert!(plan.transition(&user("nobody"), NodeState::Ready).is_err());
}
