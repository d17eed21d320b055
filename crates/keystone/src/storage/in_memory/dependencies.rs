//! `DependencyStore` implementation for in-memory storage.

use super::edges::EdgeIndex;
use crate::domain::{DependencyEdge, WorkItemId};
use crate::error::Result;
use crate::storage::DependencyStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory dependency store.
///
/// Cloning is cheap and yields a handle to the same underlying edges.
///
/// # Example
///
/// ```
/// use keystone::domain::{DependencyEdge, DependencyType};
/// use keystone::storage::in_memory::InMemoryDependencyStore;
/// use keystone::storage::DependencyStore;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let store = InMemoryDependencyStore::new();
///     let edge = DependencyEdge::new("b".into(), "a".into(), DependencyType::Blocks, "alice");
///     store.insert(edge).await.unwrap();
///     assert_eq!(store.len().await, 1);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDependencyStore {
    inner: Arc<RwLock<EdgeIndex>>,
}

impl InMemoryDependencyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_index(index: EdgeIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// Number of recorded edges.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Returns `true` when no edges are recorded.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DependencyStore for InMemoryDependencyStore {
    async fn insert(&self, edge: DependencyEdge) -> Result<DependencyEdge> {
        let mut inner = self.inner.write().await;
        let edge = inner.insert(edge)?;
        tracing::debug!(
            dependent = %edge.dependent_id,
            dependency = %edge.dependency_id,
            dep_type = %edge.dep_type,
            "Recorded dependency"
        );
        Ok(edge)
    }

    async fn remove(&self, dependent: &WorkItemId, dependency: &WorkItemId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.remove(dependent, dependency))
    }

    async fn get(
        &self,
        dependent: &WorkItemId,
        dependency: &WorkItemId,
    ) -> Result<Option<DependencyEdge>> {
        let inner = self.inner.read().await;
        Ok(inner.get(dependent, dependency).cloned())
    }

    async fn incoming(&self, id: &WorkItemId) -> Result<Vec<DependencyEdge>> {
        let inner = self.inner.read().await;
        Ok(inner.incoming(id))
    }

    async fn outgoing(&self, id: &WorkItemId) -> Result<Vec<DependencyEdge>> {
        let inner = self.inner.read().await;
        Ok(inner.outgoing(id))
    }

    async fn all(&self) -> Result<Vec<DependencyEdge>> {
        let inner = self.inner.read().await;
        Ok(inner.all())
    }

    async fn save(&self) -> Result<()> {
        // Ephemeral backend; JSONL persistence lives in `save_to_jsonl`
        Ok(())
    }
}
