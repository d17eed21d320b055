//! Domain types for dependency tracking and scheduling.
//!
//! This module contains the value types shared by the stores, the graph
//! builder and the schedule calculator.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a work item.
///
/// Identifiers are opaque to the engine. Their ordering is only used to
/// break ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkItemId(pub String);

impl WorkItemId {
    /// Create a new work item ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a work item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    /// Not started
    #[default]
    Open,

    /// Currently being worked on
    #[serde(rename = "in_progress")]
    InProgress,

    /// Cannot currently proceed
    Blocked,

    /// Completed
    Closed,
}

/// Why and since when a work item is blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedInfo {
    /// Free-form reason
    pub reason: String,

    /// Who or what is blocking the item (optional)
    pub blocked_by: Option<String>,

    /// When the item was marked as blocked
    pub blocked_at: DateTime<Utc>,
}

/// A work item as seen by the engine.
///
/// The work-item store owns these records; the engine only reads snapshots
/// and asks the store to flip the blocked flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier
    pub id: WorkItemId,

    /// Human readable title
    pub title: String,

    /// Estimated effort in whole days; the configured default applies when absent
    pub estimated_days: Option<u64>,

    /// Current lifecycle status
    pub status: WorkItemStatus,

    /// Present while the item is blocked
    pub blocked: Option<BlockedInfo>,
}

impl WorkItem {
    /// Create an open, unblocked work item with the given estimate.
    pub fn new(id: impl Into<WorkItemId>, title: impl Into<String>, estimated_days: u64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            estimated_days: Some(estimated_days),
            status: WorkItemStatus::Open,
            blocked: None,
        }
    }

    /// Builder-style status override, mostly useful in tests and fixtures.
    #[must_use]
    pub fn with_status(mut self, status: WorkItemStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns `true` when the item cannot currently proceed.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.status == WorkItemStatus::Blocked
    }

    /// Returns `true` when the item is finished.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == WorkItemStatus::Closed
    }

    /// Effective duration, falling back to `default_days` for unestimated items.
    #[must_use]
    pub fn duration_or(&self, default_days: u64) -> u64 {
        self.estimated_days.unwrap_or(default_days)
    }
}

/// Type of dependency relationship
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    /// Hard blocker - the dependent cannot start before the dependency finishes
    #[default]
    Blocks,

    /// Soft link recorded between related items
    RelatesTo,

    /// Hierarchical - child depends on parent
    ParentChild,

    /// Provenance - found while working on the dependency
    DiscoveredFrom,
}

impl DependencyType {
    /// Canonical label as stored and displayed.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::RelatesTo => "relates-to",
            Self::ParentChild => "parent-child",
            Self::DiscoveredFrom => "discovered-from",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = Error;

    /// Accepts `BLOCKS`, `relates-to`, `RELATES_TO` and the like.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "blocks" => Ok(Self::Blocks),
            "relates-to" | "related" => Ok(Self::RelatesTo),
            "parent-child" => Ok(Self::ParentChild),
            "discovered-from" => Ok(Self::DiscoveredFrom),
            _ => Err(Error::InvalidDependencyType(s.to_string())),
        }
    }
}

/// A recorded dependency: `dependent_id` cannot finish before `dependency_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The item that depends on another
    pub dependent_id: WorkItemId,

    /// The item being depended upon
    pub dependency_id: WorkItemId,

    /// Relationship label
    pub dep_type: DependencyType,

    /// Identity of whoever recorded the edge
    pub created_by: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl DependencyEdge {
    /// Create an edge stamped with the current time.
    pub fn new(
        dependent_id: WorkItemId,
        dependency_id: WorkItemId,
        dep_type: DependencyType,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            dependent_id,
            dependency_id,
            dep_type,
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }

    /// Returns `true` if this edge connects the given ordered pair.
    #[must_use]
    pub fn connects(&self, dependent: &WorkItemId, dependency: &WorkItemId) -> bool {
        &self.dependent_id == dependent && &self.dependency_id == dependency
    }

    /// Returns `true` if both endpoints are the same item.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.dependent_id == self.dependency_id
    }
}

/// Which side of an edge an item sits on when listing its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyDirection {
    /// Edges where the item is the dependent (what it waits on)
    Incoming,

    /// Edges where the item is the dependency (what waits on it)
    Outgoing,
}

impl FromStr for DependencyDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("incoming") {
            Ok(Self::Incoming)
        } else if s.eq_ignore_ascii_case("outgoing") {
            Ok(Self::Outgoing)
        } else {
            Err(Error::InvalidDirection(s.to_string()))
        }
    }
}
