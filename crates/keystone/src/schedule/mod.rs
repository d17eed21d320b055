//! Critical path method over a [`ScopedGraph`].
//!
//! [`Schedule::compute`] runs the classic two passes:
//!
//! - **Forward**, in topological order: `ES = max(EF of dependencies)` or 0,
//!   `EF = ES + duration`
//! - **Backward**, in reverse order: `LF = min(LS of dependents)` or the
//!   project finish, `LS = LF - duration`
//!
//! `slack = LS - ES`. Items with zero slack are critical.
//!
//! All times are whole days relative to the project start.

mod completion;
mod impact;
mod parallel;

pub use completion::completion_dates;
pub use impact::{AffectedItem, DelayImpact, simulate_delay};
pub use parallel::parallel_paths;

use crate::domain::WorkItemId;
use crate::error::{Error, Result};
use crate::graph::ScopedGraph;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Timing of one work item within a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleNode {
    /// Work item
    pub id: WorkItemId,
    /// Duration in days used for the calculation
    pub duration: u64,
    /// Earliest start
    pub earliest_start: u64,
    /// Earliest finish
    pub earliest_finish: u64,
    /// Latest start that does not delay the project
    pub latest_start: u64,
    /// Latest finish that does not delay the project
    pub latest_finish: u64,
    /// Float available before the project finish moves
    pub slack: u64,
}

impl ScheduleNode {
    /// Returns `true` for zero-slack items.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.slack == 0
    }
}

/// Result of a critical path calculation over one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    order: Vec<WorkItemId>,
    nodes: BTreeMap<WorkItemId, ScheduleNode>,
    project_finish: u64,
    critical_path: Vec<WorkItemId>,
}

impl Schedule {
    /// Run the forward and backward passes.
    ///
    /// `durations` must hold an entry for every item in the graph.
    ///
    /// # Errors
    ///
    /// - `Error::WorkItemNotFound` if a scoped item has no duration
    /// - `Error::InternalInconsistency` if the topological sort fails or the
    ///   day arithmetic overflows
    pub fn compute(graph: &ScopedGraph, durations: &HashMap<WorkItemId, u64>) -> Result<Self> {
        let order = graph.topological_indices()?;
        let n = graph.node_count();

        let mut duration = vec![0u64; n];
        for &node in &order {
            let id = graph.id(node);
            duration[node.index()] = *durations
                .get(id)
                .ok_or_else(|| Error::WorkItemNotFound(id.clone()))?;
        }

        let mut es = vec![0u64; n];
        let mut ef = vec![0u64; n];
        for &node in &order {
            let start = graph
                .neighbor_indices(node, Direction::Outgoing)
                .iter()
                .map(|dep| ef[dep.index()])
                .max()
                .unwrap_or(0);
            es[node.index()] = start;
            ef[node.index()] = start
                .checked_add(duration[node.index()])
                .ok_or_else(|| overflow(graph.id(node)))?;
        }

        let project_finish = ef.iter().copied().max().unwrap_or(0);

        let mut ls = vec![0u64; n];
        let mut lf = vec![0u64; n];
        for &node in order.iter().rev() {
            let finish = graph
                .neighbor_indices(node, Direction::Incoming)
                .iter()
                .map(|dependent| ls[dependent.index()])
                .min()
                .unwrap_or(project_finish);
            lf[node.index()] = finish;
            ls[node.index()] = finish
                .checked_sub(duration[node.index()])
                .ok_or_else(|| overflow(graph.id(node)))?;
        }

        let mut slack = vec![0u64; n];
        for &node in &order {
            let i = node.index();
            slack[i] = ls[i].checked_sub(es[i]).ok_or_else(|| {
                Error::InternalInconsistency(format!(
                    "negative slack for {}: LS {} < ES {}",
                    graph.id(node),
                    ls[i],
                    es[i]
                ))
            })?;
        }

        let critical_path = trace_critical_path(graph, &es, &ef, &slack)
            .into_iter()
            .map(|node| graph.id(node).clone())
            .collect();

        let nodes = order
            .iter()
            .map(|&node| {
                let i = node.index();
                let id = graph.id(node).clone();
                let timing = ScheduleNode {
                    id: id.clone(),
                    duration: duration[i],
                    earliest_start: es[i],
                    earliest_finish: ef[i],
                    latest_start: ls[i],
                    latest_finish: lf[i],
                    slack: slack[i],
                };
                (id, timing)
            })
            .collect();

        let schedule = Self {
            order: order.iter().map(|&node| graph.id(node).clone()).collect(),
            nodes,
            project_finish,
            critical_path,
        };

        tracing::debug!(
            items = schedule.order.len(),
            project_finish,
            critical_path_len = schedule.critical_path.len(),
            "Computed schedule"
        );

        Ok(schedule)
    }

    /// Items in topological order, dependencies first.
    #[must_use]
    pub fn order(&self) -> &[WorkItemId] {
        &self.order
    }

    /// Timing for one item, if it is in scope.
    #[must_use]
    pub fn node(&self, id: &WorkItemId) -> Option<&ScheduleNode> {
        self.nodes.get(id)
    }

    /// Timings for every item, in topological order.
    pub fn nodes(&self) -> impl Iterator<Item = &ScheduleNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Finish day of the whole scope (max EF, 0 when empty).
    #[must_use]
    pub fn project_finish(&self) -> u64 {
        self.project_finish
    }

    /// The reconstructed critical path, from first to last item.
    #[must_use]
    pub fn critical_path(&self) -> &[WorkItemId] {
        &self.critical_path
    }

    /// Every zero-slack item, ordered by (ES, id).
    #[must_use]
    pub fn critical_items(&self) -> Vec<&ScheduleNode> {
        let mut critical: Vec<_> = self.nodes.values().filter(|n| n.is_critical()).collect();
        critical.sort_by(|a, b| (a.earliest_start, &a.id).cmp(&(b.earliest_start, &b.id)));
        critical
    }

    /// Number of scheduled items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` when nothing was scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn overflow(id: &WorkItemId) -> Error {
    Error::InternalInconsistency(format!("day arithmetic overflowed at {id}"))
}

/// Walk from the first zero-slack source through tight zero-slack links.
///
/// A link is tight when the dependent starts exactly when the current item
/// finishes. Candidates are compared by (ES, id); index order equals id
/// order within a scoped graph.
fn trace_critical_path(graph: &ScopedGraph, es: &[u64], ef: &[u64], slack: &[u64]) -> Vec<NodeIndex> {
    let start = graph
        .node_indices()
        .filter(|&node| slack[node.index()] == 0)
        .filter(|&node| graph.neighbor_indices(node, Direction::Outgoing).is_empty())
        .min_by_key(|&node| (es[node.index()], node));

    let Some(mut current) = start else {
        return Vec::new();
    };

    let mut path = vec![current];
    while let Some(next) = graph
        .neighbor_indices(current, Direction::Incoming)
        .into_iter()
        .filter(|d| slack[d.index()] == 0 && es[d.index()] == ef[current.index()])
        .min_by_key(|&d| (es[d.index()], d))
    {
        path.push(next);
        current = next;
    }
    path
}
