//! Three-colour depth-first cycle detection.
//!
//! White nodes are unvisited, grey nodes are on the current DFS path and
//! black nodes are finished. Reaching a grey node closes a cycle.
//!
//! The traversal is iterative so deep dependency chains cannot overflow the
//! call stack.

use crate::domain::{DependencyType, WorkItemId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    cursor: usize,
}

impl Frame {
    fn new(graph: &DiGraph<WorkItemId, DependencyType>, node: NodeIndex) -> Self {
        let mut successors: Vec<NodeIndex> = graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        successors.sort_unstable();
        Self {
            node,
            successors,
            cursor: 0,
        }
    }
}

/// Find one cycle, if any.
///
/// Roots and successors are visited in ascending index order, so the same
/// graph always reports the same cycle. Members are returned in dependency
/// order starting from the node where the cycle was entered: each member
/// depends on the next, and the last depends on the first.
pub(super) fn find_cycle(graph: &DiGraph<WorkItemId, DependencyType>) -> Option<Vec<WorkItemId>> {
    let mut color = vec![Color::White; graph.node_count()];

    for root in graph.node_indices() {
        if color[root.index()] != Color::White {
            continue;
        }

        color[root.index()] = Color::Gray;
        let mut stack = vec![Frame::new(graph, root)];

        while let Some(frame) = stack.last_mut() {
            let Some(&next) = frame.successors.get(frame.cursor) else {
                color[frame.node.index()] = Color::Black;
                stack.pop();
                continue;
            };
            frame.cursor += 1;

            match color[next.index()] {
                Color::White => {
                    color[next.index()] = Color::Gray;
                    stack.push(Frame::new(graph, next));
                }
                Color::Gray => {
                    // Grey nodes are exactly the nodes on the stack
                    let start = stack
                        .iter()
                        .position(|f| f.node == next)
                        .unwrap_or_default();
                    return Some(
                        stack[start..]
                            .iter()
                            .map(|f| graph[f.node].clone())
                            .collect(),
                    );
                }
                Color::Black => {}
            }
        }
    }

    None
}
