//! Scope selection over raw edge snapshots.
//!
//! Walks the edge list directly, before any graph is built, so a scoped
//! calculation only pays for the part of the store it needs.

use crate::domain::{DependencyEdge, WorkItemId};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// `target` plus everything it transitively depends on.
///
/// Cycles among the ancestors terminate the walk normally; the graph
/// builder reports them.
#[must_use]
pub fn ancestors_scope(target: &WorkItemId, edges: &[DependencyEdge]) -> BTreeSet<WorkItemId> {
    let mut dependencies: HashMap<&WorkItemId, Vec<&WorkItemId>> = HashMap::new();
    for edge in edges {
        dependencies
            .entry(&edge.dependent_id)
            .or_default()
            .push(&edge.dependency_id);
    }

    let mut scope = BTreeSet::from([target.clone()]);
    let mut queue = VecDeque::from([target]);
    while let Some(current) = queue.pop_front() {
        for &dependency in dependencies.get(current).into_iter().flatten() {
            if scope.insert(dependency.clone()) {
                queue.push_back(dependency);
            }
        }
    }
    scope
}
