//! Storage abstraction layer for keystone.
//!
//! The engine consumes two collaborators, each behind an object-safe async
//! trait so callers can inject any backend:
//!
//! - [`WorkItemStore`]: owns work items and their blocked flag
//! - [`DependencyStore`]: owns dependency edges
//!
//! Both traits take `&self` for writes. Implementations are shared between
//! concurrent callers (`Arc<dyn …>`) and synchronise internally.
//!
//! # Example
//!
//! ```no_run
//! use keystone::domain::{DependencyEdge, DependencyType};
//! use keystone::storage::{create_dependency_store, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let store = create_dependency_store(StorageBackend::InMemory).await?;
//!     store
//!         .insert(DependencyEdge::new(
//!             "api".into(),
//!             "schema".into(),
//!             DependencyType::Blocks,
//!             "alice",
//!         ))
//!         .await?;
//!     store.save().await?;
//!     Ok(())
//! }
//! ```

use crate::domain::{BlockedInfo, DependencyEdge, WorkItem, WorkItemId};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Storage backend implementations
pub mod in_memory;

/// Read access to work items plus the blocked-flag mutations the engine
/// delegates.
///
/// # Errors
///
/// Mutating methods return `Error::WorkItemNotFound` for unknown ids.
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Get a work item by ID.
    ///
    /// Returns `None` if the item doesn't exist.
    async fn get(&self, id: &WorkItemId) -> Result<Option<WorkItem>>;

    /// Check whether a work item exists.
    async fn exists(&self, id: &WorkItemId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Snapshot of every tracked work item, in ascending id order.
    async fn list(&self) -> Result<Vec<WorkItem>>;

    /// Insert or replace a work item.
    async fn insert(&self, item: WorkItem) -> Result<()>;

    /// Mark an item as blocked and return the updated record.
    async fn set_blocked(&self, id: &WorkItemId, info: BlockedInfo) -> Result<WorkItem>;

    /// Clear the blocked flag and return the updated record.
    async fn clear_blocked(&self, id: &WorkItemId) -> Result<WorkItem>;
}

/// Durable mapping of dependency edges.
///
/// Edges are directional: `dependent_id` depends on `dependency_id`.
/// Stores reject self-loops and duplicate pairs but never check for cycles;
/// cycles are detected when a graph is built for a concrete scope.
#[async_trait]
pub trait DependencyStore: Send + Sync {
    /// Record a new edge.
    ///
    /// # Errors
    ///
    /// - `Error::SelfDependency` if both endpoints are the same item
    /// - `Error::DuplicateDependency` if the ordered pair already exists
    async fn insert(&self, edge: DependencyEdge) -> Result<DependencyEdge>;

    /// Remove an edge. Returns `false` when the edge did not exist.
    async fn remove(&self, dependent: &WorkItemId, dependency: &WorkItemId) -> Result<bool>;

    /// Look up a single edge by its endpoints.
    async fn get(
        &self,
        dependent: &WorkItemId,
        dependency: &WorkItemId,
    ) -> Result<Option<DependencyEdge>>;

    /// Check whether `dependent` directly depends on `dependency`.
    async fn has_dependency(&self, dependent: &WorkItemId, dependency: &WorkItemId) -> Result<bool> {
        Ok(self.get(dependent, dependency).await?.is_some())
    }

    /// Edges where `id` is the dependent, in insertion order.
    async fn incoming(&self, id: &WorkItemId) -> Result<Vec<DependencyEdge>>;

    /// Edges where `id` is the dependency, in insertion order.
    async fn outgoing(&self, id: &WorkItemId) -> Result<Vec<DependencyEdge>>;

    /// Consistent snapshot of every edge, in insertion order.
    async fn all(&self) -> Result<Vec<DependencyEdge>>;

    /// Persist pending changes. A no-op for ephemeral backends.
    async fn save(&self) -> Result<()>;
}

/// Dependency storage backend type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// In-memory storage persisted to a JSONL file on `save()`
    Jsonl(PathBuf),
}

impl StorageBackend {
    /// Returns the data file path for file-based backends.
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Jsonl(path) => Some(path),
            StorageBackend::InMemory => None,
        }
    }
}

/// Wrapper that adds JSONL file persistence to the in-memory edge store.
struct JsonlBackedDependencyStore {
    inner: in_memory::InMemoryDependencyStore,
    path: PathBuf,
}

#[async_trait]
impl DependencyStore for JsonlBackedDependencyStore {
    async fn insert(&self, edge: DependencyEdge) -> Result<DependencyEdge> {
        self.inner.insert(edge).await
    }

    async fn remove(&self, dependent: &WorkItemId, dependency: &WorkItemId) -> Result<bool> {
        self.inner.remove(dependent, dependency).await
    }

    async fn get(
        &self,
        dependent: &WorkItemId,
        dependency: &WorkItemId,
    ) -> Result<Option<DependencyEdge>> {
        self.inner.get(dependent, dependency).await
    }

    async fn incoming(&self, id: &WorkItemId) -> Result<Vec<DependencyEdge>> {
        self.inner.incoming(id).await
    }

    async fn outgoing(&self, id: &WorkItemId) -> Result<Vec<DependencyEdge>> {
        self.inner.outgoing(id).await
    }

    async fn all(&self) -> Result<Vec<DependencyEdge>> {
        self.inner.all().await
    }

    async fn save(&self) -> Result<()> {
        in_memory::save_to_jsonl(&self.inner, &self.path).await
    }
}

/// Create a dependency store for the given backend.
///
/// For [`StorageBackend::Jsonl`] an existing file is loaded first; load
/// warnings are logged and skipped so the store stays usable.
///
/// # Errors
///
/// - `Error::Io` if the data file exists but cannot be read
pub async fn create_dependency_store(backend: StorageBackend) -> Result<Arc<dyn DependencyStore>> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(in_memory::InMemoryDependencyStore::new())),
        StorageBackend::Jsonl(path) => {
            let inner = if path.exists() {
                let (store, warnings) = in_memory::load_from_jsonl(&path).await?;
                for warning in &warnings {
                    tracing::warn!(warning = ?warning, "JSONL load warning");
                }
                store
            } else {
                // First run: the file is created on the first save
                in_memory::InMemoryDependencyStore::new()
            };
            Ok(Arc::new(JsonlBackedDependencyStore { inner, path }))
        }
    }
}
