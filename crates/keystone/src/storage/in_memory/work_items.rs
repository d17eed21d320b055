//! `WorkItemStore` implementation for in-memory storage.
//!
//! Work items belong to an external tracker in production; this backend
//! stands in for it in tests and embedded setups.

use crate::domain::{BlockedInfo, WorkItem, WorkItemId, WorkItemStatus};
use crate::error::{Error, Result};
use crate::storage::WorkItemStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory work item store.
///
/// Items are kept in a `BTreeMap` so that `list()` is ordered by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkItemStore {
    inner: Arc<RwLock<BTreeMap<WorkItemId, WorkItem>>>,
}

impl InMemoryWorkItemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `items`.
    ///
    /// Later items replace earlier ones with the same id.
    pub fn with_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let map = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl WorkItemStore for InMemoryWorkItemStore {
    async fn get(&self, id: &WorkItemId) -> Result<Option<WorkItem>> {
        let inner = self.inner.read().await;
        Ok(inner.get(id).cloned())
    }

    async fn exists(&self, id: &WorkItemId) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.contains_key(id))
    }

    async fn list(&self) -> Result<Vec<WorkItem>> {
        let inner = self.inner.read().await;
        Ok(inner.values().cloned().collect())
    }

    async fn insert(&self, item: WorkItem) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.insert(item.id.clone(), item);
        Ok(())
    }

    async fn set_blocked(&self, id: &WorkItemId, info: BlockedInfo) -> Result<WorkItem> {
        let mut inner = self.inner.write().await;
        let item = inner
            .get_mut(id)
            .ok_or_else(|| Error::WorkItemNotFound(id.clone()))?;

        item.status = WorkItemStatus::Blocked;
        item.blocked = Some(info);
        Ok(item.clone())
    }

    async fn clear_blocked(&self, id: &WorkItemId) -> Result<WorkItem> {
        let mut inner = self.inner.write().await;
        let item = inner
            .get_mut(id)
            .ok_or_else(|| Error::WorkItemNotFound(id.clone()))?;

        // Only a blocked item returns to Open; other statuses are left alone
        if item.status == WorkItemStatus::Blocked {
            item.status = WorkItemStatus::Open;
        }
        item.blocked = None;
        Ok(item.clone())
    }
}
