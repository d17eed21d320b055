//! Chain decomposition of a schedule into parallel work streams.

use super::Schedule;
use crate::domain::WorkItemId;
use crate::error::{Error, Result};
use crate::graph::ScopedGraph;
use std::collections::HashSet;

/// Partition every scheduled item into chains.
///
/// The first chain is the critical path. Each further chain starts at the
/// first unassigned item in topological order and keeps extending through
/// unassigned dependents, preferring the smallest (slack, ES, id). Items in
/// different chains can be worked on in parallel.
///
/// # Errors
///
/// Returns `Error::InternalInconsistency` if the graph and the schedule
/// disagree about which items are in scope.
pub fn parallel_paths(graph: &ScopedGraph, schedule: &Schedule) -> Result<Vec<Vec<WorkItemId>>> {
    let mut assigned: HashSet<&WorkItemId> = schedule.critical_path().iter().collect();
    let mut chains = Vec::new();
    if !schedule.critical_path().is_empty() {
        chains.push(schedule.critical_path().to_vec());
    }

    for start in schedule.order() {
        if !assigned.insert(start) {
            continue;
        }

        let mut chain = vec![start.clone()];
        let mut current = start;
        loop {
            let mut best: Option<(u64, u64, &WorkItemId)> = None;
            for dependent in graph.dependents(current) {
                if assigned.contains(dependent) {
                    continue;
                }
                let timing = schedule.node(dependent).ok_or_else(|| {
                    Error::InternalInconsistency(format!("{dependent} missing from schedule"))
                })?;
                let key = (timing.slack, timing.earliest_start, dependent);
                if best.is_none_or(|b| key < b) {
                    best = Some(key);
                }
            }

            let Some((_, _, next)) = best else {
                break;
            };
            assigned.insert(next);
            chain.push(next.clone());
            current = next;
        }
        chains.push(chain);
    }

    Ok(chains)
}
