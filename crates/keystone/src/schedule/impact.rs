//! What-if simulation of a delay on one work item.

use super::Schedule;
use crate::domain::WorkItemId;
use crate::error::{Error, Result};
use crate::graph::ScopedGraph;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// A downstream item whose finish moves because of a delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedItem {
    /// Work item
    pub id: WorkItemId,
    /// Earliest finish before the delay
    pub original_finish: u64,
    /// Earliest finish after the delay
    pub delayed_finish: u64,
}

impl AffectedItem {
    /// Days the item slips.
    #[must_use]
    pub fn slip(&self) -> u64 {
        self.delayed_finish.saturating_sub(self.original_finish)
    }
}

/// Outcome of [`simulate_delay`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelayImpact {
    /// The delayed item
    pub item: WorkItemId,
    /// Simulated delay in days
    pub delay_days: u64,
    /// Project finish before the delay
    pub original_project_finish: u64,
    /// Project finish after the delay
    pub delayed_project_finish: u64,
    /// Descendants whose finish moves, in breadth-first discovery order
    pub affected: Vec<AffectedItem>,
}

impl DelayImpact {
    /// Days the whole project slips.
    #[must_use]
    pub fn project_slip(&self) -> u64 {
        self.delayed_project_finish
            .saturating_sub(self.original_project_finish)
    }
}

/// Push `item`'s finish back by `delay_days` and see what moves.
///
/// Nothing is written back; the schedule is left untouched. Descendants are
/// re-timed in topological order, and only those whose earliest finish
/// actually grows are reported. Slack on a parallel branch can absorb the
/// delay entirely.
///
/// # Errors
///
/// - `Error::WorkItemNotFound` if `item` is not in the schedule
/// - `Error::InternalInconsistency` on arithmetic overflow
pub fn simulate_delay(
    graph: &ScopedGraph,
    schedule: &Schedule,
    item: &WorkItemId,
    delay_days: u64,
) -> Result<DelayImpact> {
    let origin = schedule
        .node(item)
        .ok_or_else(|| Error::WorkItemNotFound(item.clone()))?;

    let mut impact = DelayImpact {
        item: item.clone(),
        delay_days,
        original_project_finish: schedule.project_finish(),
        delayed_project_finish: schedule.project_finish(),
        affected: Vec::new(),
    };
    if delay_days == 0 {
        return Ok(impact);
    }

    let descendants = descendants_bfs(graph, item);
    let in_reach: HashSet<&WorkItemId> = descendants.iter().copied().collect();

    let mut finish: HashMap<&WorkItemId, u64> = HashMap::new();
    finish.insert(
        item,
        origin
            .earliest_finish
            .checked_add(delay_days)
            .ok_or_else(|| overflow(item))?,
    );

    for id in schedule.order() {
        if !in_reach.contains(id) {
            continue;
        }
        let mut start = 0;
        for dependency in graph.dependencies(id) {
            let dep_finish = match finish.get(dependency) {
                Some(&f) => f,
                None => schedule.node(dependency).map_or(0, |n| n.earliest_finish),
            };
            start = start.max(dep_finish);
        }
        let duration = schedule.node(id).map_or(0, |n| n.duration);
        finish.insert(id, start.checked_add(duration).ok_or_else(|| overflow(id))?);
    }

    impact.affected = descendants
        .into_iter()
        .filter_map(|id| {
            let original = schedule.node(id)?.earliest_finish;
            let delayed = *finish.get(id)?;
            (delayed > original).then(|| AffectedItem {
                id: id.clone(),
                original_finish: original,
                delayed_finish: delayed,
            })
        })
        .collect();

    impact.delayed_project_finish = finish
        .values()
        .copied()
        .fold(schedule.project_finish(), u64::max);

    tracing::debug!(
        item = %item,
        delay_days,
        affected = impact.affected.len(),
        project_slip = impact.project_slip(),
        "Simulated delay"
    );

    Ok(impact)
}

/// Items transitively depending on `source`, in breadth-first order.
/// Dependents of each item are visited in ascending id order.
fn descendants_bfs<'g>(graph: &'g ScopedGraph, source: &WorkItemId) -> Vec<&'g WorkItemId> {
    let mut seen: HashSet<&WorkItemId> = HashSet::from([source]);
    let mut queue: VecDeque<&WorkItemId> = VecDeque::from([source]);
    let mut order = Vec::new();

    while let Some(current) = queue.pop_front() {
        for dependent in graph.dependents(current) {
            if seen.insert(dependent) {
                order.push(dependent);
                queue.push_back(dependent);
            }
        }
    }
    order
}

fn overflow(id: &WorkItemId) -> Error {
    Error::InternalInconsistency(format!("delayed finish of {id} overflowed"))
}
