//! Error types for keystone operations.
//!
//! Every failure aborts the requested computation and surfaces one of these
//! variants. No operation returns a partially computed schedule.

use crate::domain::WorkItemId;
use std::io;
use thiserror::Error;

/// The error type for keystone operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced work item does not exist.
    #[error("Work item not found: {0}")]
    WorkItemNotFound(WorkItemId),

    /// Referenced dependency edge does not exist.
    #[error("Dependency not found: {dependent} -> {dependency}")]
    DependencyNotFound {
        /// The item that would depend on `dependency`
        dependent: WorkItemId,
        /// The item being depended upon
        dependency: WorkItemId,
    },

    /// An item cannot depend on itself.
    #[error("Work item cannot depend on itself: {0}")]
    SelfDependency(WorkItemId),

    /// The ordered pair is already recorded.
    #[error("Dependency already exists: {dependent} -> {dependency}")]
    DuplicateDependency {
        /// The dependent side of the existing edge
        dependent: WorkItemId,
        /// The dependency side of the existing edge
        dependency: WorkItemId,
    },

    /// The requested scope contains a directed cycle.
    #[error("Cyclic dependency detected: {}", format_cycle(.cycle))]
    CyclicDependency {
        /// Cycle members in dependency order; the first member closes the loop
        cycle: Vec<WorkItemId>,
    },

    /// A scheduling invariant failed after the cycle check passed.
    ///
    /// This points at a logic bug or a mutation between snapshot and use,
    /// never at bad user input.
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// The requested scope exceeds the configured node limit.
    #[error("Scope of {size} work items exceeds the limit of {limit}")]
    ScopeTooLarge {
        /// Number of items in the requested scope
        size: usize,
        /// Configured `max-scope-nodes`
        limit: usize,
    },

    /// Direction label was neither `incoming` nor `outgoing`.
    #[error("Direction must be either 'incoming' or 'outgoing', got '{0}'")]
    InvalidDirection(String),

    /// Dependency type label is not recognised.
    #[error("Unknown dependency type: '{0}'")]
    InvalidDependencyType(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for errors caused by the caller's input or data,
    /// as opposed to defects or infrastructure failures.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::WorkItemNotFound(_)
                | Self::DependencyNotFound { .. }
                | Self::SelfDependency(_)
                | Self::DuplicateDependency { .. }
                | Self::CyclicDependency { .. }
                | Self::ScopeTooLarge { .. }
                | Self::InvalidDirection(_)
                | Self::InvalidDependencyType(_)
        )
    }
}

fn format_cycle(cycle: &[WorkItemId]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(ToString::to_string).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}

/// A specialized Result type for keystone operations.
pub type Result<T> = std::result::Result<T, Error>;
