//! Kahn's algorithm with a deterministic ready set.

use crate::domain::{DependencyType, WorkItemId};
use crate::error::{Error, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Topological order over node indices, dependencies first.
///
/// The ready set is a min-heap, so among items whose dependencies are all
/// placed the lowest index (and therefore lowest id) goes next.
pub(super) fn kahn_order(graph: &DiGraph<WorkItemId, DependencyType>) -> Result<Vec<NodeIndex>> {
    // Unplaced dependencies per node; parallel edges count once each on
    // both sides, so the bookkeeping stays consistent.
    let mut pending: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.edges_directed(node, Direction::Outgoing).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|node| pending[node.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for edge in graph.edges_directed(node, Direction::Incoming) {
            let dependent = edge.source();
            let count = &mut pending[dependent.index()];
            *count -= 1;
            if *count == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() != graph.node_count() {
        return Err(Error::InternalInconsistency(format!(
            "topological sort placed {} of {} work items",
            order.len(),
            graph.node_count()
        )));
    }

    Ok(order)
}
