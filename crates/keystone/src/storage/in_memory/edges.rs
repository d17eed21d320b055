//! Core edge index behind the in-memory dependency store.
//!
//! Not thread-safe on its own; [`super::InMemoryDependencyStore`] wraps it in
//! `Arc<RwLock<_>>`.

use crate::domain::{DependencyEdge, WorkItemId};
use crate::error::{Error, Result};
use std::collections::HashSet;

/// Edges in insertion order plus a pair index for O(1) duplicate checks.
#[derive(Debug, Default)]
pub(super) struct EdgeIndex {
    /// All edges, oldest first
    edges: Vec<DependencyEdge>,

    /// `(dependent, dependency)` pairs present in `edges`.
    ///
    /// Every edge in `edges` has exactly one entry here.
    pairs: HashSet<(WorkItemId, WorkItemId)>,
}

impl EdgeIndex {
    /// Append an edge after validating it.
    pub(super) fn insert(&mut self, edge: DependencyEdge) -> Result<DependencyEdge> {
        if edge.is_self_loop() {
            return Err(Error::SelfDependency(edge.dependent_id));
        }

        let key = (edge.dependent_id.clone(), edge.dependency_id.clone());
        if self.pairs.contains(&key) {
            return Err(Error::DuplicateDependency {
                dependent: key.0,
                dependency: key.1,
            });
        }

        self.pairs.insert(key);
        self.edges.push(edge.clone());
        Ok(edge)
    }

    /// Remove the edge for the given pair, preserving the order of the rest.
    pub(super) fn remove(&mut self, dependent: &WorkItemId, dependency: &WorkItemId) -> bool {
        let key = (dependent.clone(), dependency.clone());
        if !self.pairs.remove(&key) {
            return false;
        }
        self.edges.retain(|edge| !edge.connects(dependent, dependency));
        true
    }

    pub(super) fn get(
        &self,
        dependent: &WorkItemId,
        dependency: &WorkItemId,
    ) -> Option<&DependencyEdge> {
        self.edges
            .iter()
            .find(|edge| edge.connects(dependent, dependency))
    }

    /// Edges where `id` is the dependent.
    pub(super) fn incoming(&self, id: &WorkItemId) -> Vec<DependencyEdge> {
        self.edges
            .iter()
            .filter(|edge| &edge.dependent_id == id)
            .cloned()
            .collect()
    }

    /// Edges where `id` is the dependency.
    pub(super) fn outgoing(&self, id: &WorkItemId) -> Vec<DependencyEdge> {
        self.edges
            .iter()
            .filter(|edge| &edge.dependency_id == id)
            .cloned()
            .collect()
    }

    pub(super) fn all(&self) -> Vec<DependencyEdge> {
        self.edges.clone()
    }

    pub(super) fn len(&self) -> usize {
        self.edges.len()
    }
}
