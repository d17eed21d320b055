//! Common fixtures shared across integration tests.

#![allow(dead_code)]

use keystone::domain::{DependencyType, WorkItem, WorkItemId};
use keystone::service::CriticalPathService;
use keystone::storage::in_memory::{InMemoryDependencyStore, InMemoryWorkItemStore};
use std::sync::Arc;

/// Build a service over in-memory stores from `(id, days)` items and
/// `(dependent, dependency)` edges.
pub async fn service_with(items: &[(&str, u64)], edges: &[(&str, &str)]) -> CriticalPathService {
    let store = InMemoryWorkItemStore::with_items(
        items
            .iter()
            .map(|&(id, days)| WorkItem::new(id, id.to_uppercase(), days)),
    );
    let service = CriticalPathService::new(
        Arc::new(store),
        Arc::new(InMemoryDependencyStore::new()),
    );
    for &(dependent, dependency) in edges {
        service
            .add_dependency(
                &dependent.into(),
                &dependency.into(),
                DependencyType::Blocks,
                "fixture",
            )
            .await
            .expect("fixture edge should be valid");
    }
    service
}

/// C (3) <- B (2) <- A (1): A depends on B, B depends on C.
pub async fn chain() -> CriticalPathService {
    service_with(&[("A", 1), ("B", 2), ("C", 3)], &[("A", "B"), ("B", "C")]).await
}

/// A (2) feeds B (3) and C (0), both of which feed D (2).
pub async fn diamond() -> CriticalPathService {
    service_with(
        &[("A", 2), ("B", 3), ("C", 0), ("D", 2)],
        &[("B", "A"), ("C", "A"), ("D", "B"), ("D", "C")],
    )
    .await
}

/// Ids of a list of work items.
pub fn ids(items: &[WorkItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

/// Shorthand for building an id.
pub fn id(s: &str) -> WorkItemId {
    WorkItemId::new(s)
}
