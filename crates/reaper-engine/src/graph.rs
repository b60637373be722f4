use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use reaper_core::{EdgeDirection, ResourceCatalog, ResourceProvider, ResourceRef};
use reaper_ledger::RunId;

use crate::error::GraphError;
use crate::plan::{DeletionPlan, PlanNode};

/// Expands a target set into a full deletion plan by asking the provider
/// for the concrete resources that reference each node.
pub struct DependencyGraphBuilder<'a> {
    provider: &'a dyn ResourceProvider,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self { provider }
    }

    /// Breadth-first discovery until no new dependents appear, then cycle
    /// detection and layering. Any discovery error fails the whole build;
    /// no partial plan is ever returned.
    ///
    /// A dependent whose kind the catalog does not expect from its origin
    /// is rejected once discovery settles. Cycles take precedence, so
    /// mutually referencing resources always surface as a cycle.
    pub async fn build(
        &self,
        run_id: RunId,
        targets: impl IntoIterator<Item = ResourceRef>,
    ) -> Result<DeletionPlan, GraphError> {
        let targets: BTreeSet<ResourceRef> = targets.into_iter().collect();
        let mut nodes: BTreeMap<ResourceRef, PlanNode> = BTreeMap::new();
        let mut queue: VecDeque<ResourceRef> = VecDeque::new();
        let mut undeclared: Option<(ResourceRef, ResourceRef)> = None;

        for target in targets {
            nodes.insert(target.clone(), PlanNode::new(target.clone()));
            queue.push_back(target);
        }

        while let Some(origin) = queue.pop_front() {
            let mut discovered = self
                .provider
                .list_dependents(&origin)
                .await
                .map_err(|source| GraphError::DiscoveryFailed {
                    resource: origin.clone(),
                    source,
                })?;
            discovered.sort();
            discovered.dedup();

            tracing::debug!(
                resource = %origin,
                discovered = discovered.len(),
                "dependents discovered"
            );

            for found in discovered {
                if found == origin {
                    return Err(GraphError::CycleDetected {
                        involved: BTreeSet::from([origin]),
                    });
                }
                if found.instance_id != origin.instance_id {
                    return Err(GraphError::CrossInstance {
                        origin,
                        dependent: found,
                    });
                }

                if !ResourceCatalog::declares(origin.kind, found.kind) && undeclared.is_none() {
                    tracing::warn!(
                        origin = %origin,
                        dependent = %found,
                        "dependent kind not declared for origin"
                    );
                    undeclared = Some((origin.clone(), found.clone()));
                }

                if !nodes.contains_key(&found) {
                    nodes.insert(found.clone(), PlanNode::new(found.clone()));
                    queue.push_back(found.clone());
                }

                match ResourceCatalog::order(origin.kind, found.kind) {
                    EdgeDirection::DependentFirst => link(&mut nodes, &found, &origin),
                    EdgeDirection::OriginFirst => link(&mut nodes, &origin, &found),
                }
            }
        }

        let plan = finalize(run_id, nodes)?;
        if let Some((origin, dependent)) = undeclared {
            return Err(GraphError::UndeclaredDependency { origin, dependent });
        }
        tracing::info!(
            run_id = %run_id,
            resources = plan.len(),
            layers = plan.layers().len(),
            "deletion plan built"
        );
        Ok(plan)
    }
}

/// Record that `first` must be deleted before `then`.
pub(crate) fn link(
    nodes: &mut BTreeMap<ResourceRef, PlanNode>,
    first: &ResourceRef,
    then: &ResourceRef,
) {
    if let Some(node) = nodes.get_mut(first) {
        node.dependents.insert(then.clone());
    }
    if let Some(node) = nodes.get_mut(then) {
        node.dependencies.insert(first.clone());
    }
}

/// Reject cycles, then split the nodes into topological layers.
pub(crate) fn finalize(
    run_id: RunId,
    nodes: BTreeMap<ResourceRef, PlanNode>,
) -> Result<DeletionPlan, GraphError> {
    if let Some(involved) = find_cycle(&nodes) {
        tracing::warn!(run_id = %run_id, involved = involved.len(), "dependency cycle detected");
        return Err(GraphError::CycleDetected { involved });
    }

    let layers = layer(&nodes);
    Ok(DeletionPlan::from_parts(run_id, nodes, layers))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Three-colour DFS along dependency edges. Returns the resources on the
/// first cycle found.
fn find_cycle(nodes: &BTreeMap<ResourceRef, PlanNode>) -> Option<BTreeSet<ResourceRef>> {
    let mut color: HashMap<&ResourceRef, Color> =
        nodes.keys().map(|r| (r, Color::White)).collect();

    for (start, start_node) in nodes {
        if color.get(start) != Some(&Color::White) {
            continue;
        }
        color.insert(start, Color::Grey);
        let mut stack = vec![(start, start_node.dependencies.iter())];

        loop {
            let Some((current, deps)) = stack.last_mut() else {
                break;
            };
            let current = *current;
            match deps.next() {
                Some(next) => match color.get(next).copied() {
                    Some(Color::White) => {
                        let Some(next_node) = nodes.get(next) else {
                            continue;
                        };
                        color.insert(next, Color::Grey);
                        stack.push((next, next_node.dependencies.iter()));
                    }
                    Some(Color::Grey) => {
                        let from = stack.iter().position(|(r, _)| *r == next).unwrap_or(0);
                        return Some(stack[from..].iter().map(|(r, _)| (*r).clone()).collect());
                    }
                    _ => {}
                },
                None => {
                    color.insert(current, Color::Black);
                    stack.pop();
                }
            }
        }
    }
    None
}

/// Kahn's algorithm. Each layer holds nodes whose dependencies all sit in
/// earlier layers, sorted by (kind, id).
fn layer(nodes: &BTreeMap<ResourceRef, PlanNode>) -> Vec<Vec<ResourceRef>> {
    let mut remaining: HashMap<&ResourceRef, usize> = nodes
        .iter()
        .map(|(r, node)| (r, node.dependencies.len()))
        .collect();

    let mut current: BTreeSet<&ResourceRef> = remaining
        .iter()
        .filter(|(_, deps)| **deps == 0)
        .map(|(r, _)| *r)
        .collect();

    let mut layers = Vec::new();
    while !current.is_empty() {
        let mut next = BTreeSet::new();
        for resource in &current {
            let Some(node) = nodes.get(*resource) else {
                continue;
            };
            for dependent in &node.dependents {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        next.insert(dependent);
                    }
                }
            }
        }
        layers.push(current.into_iter().cloned().collect());
        current = next;
    }
    layers
}
