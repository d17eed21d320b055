//! Scoped dependency graphs built per calculation request.
//!
//! A [`ScopedGraph`] is materialised from a snapshot of the dependency store,
//! restricted to a scope of work items, checked for cycles and then handed to
//! the scheduler. It is never cached or mutated after construction.
//!
//! ## Edge Direction Convention
//!
//! Graph edges follow the store: **dependent -> dependency**.
//!
//! - `Direction::Outgoing` from a node reaches what it waits on
//! - `Direction::Incoming` into a node comes from what waits on it
//!
//! ## Node Ordering
//!
//! Nodes are inserted in ascending id order, so `NodeIndex` ordering matches
//! `WorkItemId` ordering. The cycle check and the topological sort rely on
//! this for deterministic output.

mod cycles;
mod scope;
mod topo;

pub use scope::ancestors_scope;

use crate::domain::{DependencyEdge, DependencyType, WorkItemId};
use crate::error::{Error, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};

/// Builds [`ScopedGraph`]s under a node-count limit.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    max_nodes: usize,
}

impl GraphBuilder {
    /// Create a builder that rejects scopes larger than `max_nodes`.
    #[must_use]
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }

    /// Build an acyclic graph over `scope` from the given edge snapshot.
    ///
    /// Edges with an endpoint outside the scope are ignored. Duplicate scope
    /// ids collapse into one node.
    ///
    /// # Errors
    ///
    /// - `Error::ScopeTooLarge` if the scope exceeds the builder's limit
    /// - `Error::CyclicDependency` if the scoped edges contain a cycle
    pub fn build<I>(&self, scope: I, edges: &[DependencyEdge]) -> Result<ScopedGraph>
    where
        I: IntoIterator<Item = WorkItemId>,
    {
        let scope: BTreeSet<WorkItemId> = scope.into_iter().collect();
        if scope.len() > self.max_nodes {
            return Err(Error::ScopeTooLarge {
                size: scope.len(),
                limit: self.max_nodes,
            });
        }

        let mut graph = DiGraph::with_capacity(scope.len(), edges.len());
        let mut node_map = HashMap::with_capacity(scope.len());
        for id in scope {
            let node = graph.add_node(id.clone());
            node_map.insert(id, node);
        }

        for edge in edges {
            let (Some(&from), Some(&to)) = (
                node_map.get(&edge.dependent_id),
                node_map.get(&edge.dependency_id),
            ) else {
                continue;
            };
            graph.add_edge(from, to, edge.dep_type);
        }

        if let Some(cycle) = cycles::find_cycle(&graph) {
            tracing::warn!(
                cycle = ?cycle.iter().map(WorkItemId::as_str).collect::<Vec<_>>(),
                "Rejected scope containing a dependency cycle"
            );
            return Err(Error::CyclicDependency { cycle });
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built scoped dependency graph"
        );

        Ok(ScopedGraph { graph, node_map })
    }
}

/// An acyclic dependency graph restricted to one scope.
#[derive(Debug, Clone)]
pub struct ScopedGraph {
    /// Nodes hold ids, edges hold the dependency type.
    /// Edge direction: source (dependent) -> target (dependency).
    graph: DiGraph<WorkItemId, DependencyType>,

    /// Every node in `graph` has exactly one entry here.
    node_map: HashMap<WorkItemId, NodeIndex>,
}

impl ScopedGraph {
    /// Number of work items in scope.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of in-scope dependency edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `true` when the scope is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns `true` if `id` is in scope.
    #[must_use]
    pub fn contains(&self, id: &WorkItemId) -> bool {
        self.node_map.contains_key(id)
    }

    /// In-scope ids, ascending.
    pub fn ids(&self) -> impl Iterator<Item = &WorkItemId> {
        self.graph.node_indices().map(|node| &self.graph[node])
    }

    /// Items `id` waits on, ascending. Empty for unknown ids.
    #[must_use]
    pub fn dependencies(&self, id: &WorkItemId) -> Vec<&WorkItemId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Items waiting on `id`, ascending. Empty for unknown ids.
    #[must_use]
    pub fn dependents(&self, id: &WorkItemId) -> Vec<&WorkItemId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Deterministic topological order: every dependency precedes its
    /// dependents, ties broken by ascending id.
    ///
    /// # Errors
    ///
    /// Returns `Error::InternalInconsistency` if the sort cannot consume
    /// every node, which the construction-time cycle check rules out.
    pub fn topological_order(&self) -> Result<Vec<WorkItemId>> {
        let order = self.topological_indices()?;
        Ok(order.into_iter().map(|node| self.graph[node].clone()).collect())
    }

    pub(crate) fn topological_indices(&self) -> Result<Vec<NodeIndex>> {
        topo::kahn_order(&self.graph)
    }

    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub(crate) fn index(&self, id: &WorkItemId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    pub(crate) fn id(&self, node: NodeIndex) -> &WorkItemId {
        &self.graph[node]
    }

    /// Sorted, de-duplicated neighbour indices in the given direction.
    pub(crate) fn neighbor_indices(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(node, direction).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    fn neighbors(&self, id: &WorkItemId, direction: Direction) -> Vec<&WorkItemId> {
        self.index(id)
            .map(|node| {
                self.neighbor_indices(node, direction)
                    .into_iter()
                    .map(|n| &self.graph[n])
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(dependent: &str, dependency: &str) -> DependencyEdge {
        DependencyEdge::new(
            dependent.into(),
            dependency.into(),
            DependencyType::Blocks,
            "tester",
        )
    }

    fn ids(names: &[&str]) -> Vec<WorkItemId> {
        names.iter().map(|&n| WorkItemId::new(n)).collect()
    }

    #[test]
    fn test_edges_outside_scope_are_dropped() {
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "x")];
        let graph = GraphBuilder::new(10)
            .build(ids(&["a", "b", "c"]), &edges)
            .unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.dependencies(&"c".into()).is_empty());
    }

    #[test]
    fn test_neighbor_lookups_are_sorted() {
        let edges = vec![edge("a", "d"), edge("a", "b"), edge("a", "c")];
        let graph = GraphBuilder::new(10)
            .build(ids(&["a", "b", "c", "d"]), &edges)
            .unwrap();

        let deps: Vec<_> = graph
            .dependencies(&"a".into())
            .into_iter()
            .map(WorkItemId::as_str)
            .collect();
        assert_eq!(deps, vec!["b", "c", "d"]);
        assert_eq!(graph.dependents(&"b".into()), vec![&WorkItemId::new("a")]);
    }

    #[test]
    fn test_cycle_rejected_with_members() {
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let err = GraphBuilder::new(10)
            .build(ids(&["a", "b", "c"]), &edges)
            .unwrap_err();

        match err {
            Error::CyclicDependency { cycle } => assert_eq!(cycle, ids(&["a", "b", "c"])),
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_outside_scope_is_ignored() {
        // b <-> c is cyclic, but only a and b are requested
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "b")];
        let graph = GraphBuilder::new(10).build(ids(&["a", "b"]), &edges).unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_scope_limit() {
        let err = GraphBuilder::new(2)
            .build(ids(&["a", "b", "c"]), &[])
            .unwrap_err();
        assert!(matches!(err, Error::ScopeTooLarge { size: 3, limit: 2 }));
    }

    #[test]
    fn test_duplicate_scope_ids_collapse() {
        let graph = GraphBuilder::new(2)
            .build(ids(&["a", "a", "b"]), &[])
            .unwrap();
        assert_eq!(graph.node_count(), 2);
    }
}
