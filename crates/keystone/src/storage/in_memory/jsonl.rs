//! JSONL persistence for the in-memory dependency store.
//!
//! Each line of the file is one serialized [`DependencyEdge`].

use super::dependencies::InMemoryDependencyStore;
use super::edges::EdgeIndex;
use crate::domain::{DependencyEdge, WorkItemId};
use crate::error::{Error, Result};
use crate::storage::DependencyStore;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Warnings that can occur during JSONL file loading.
///
/// These are non-fatal: the offending line is skipped and loading continues.
///
/// Cycles are not reported here. They are legal in the store and only
/// rejected when a graph is built for a scope that contains them.
///
/// **Example:**
/// ```no_run
/// # use keystone::storage::in_memory::{load_from_jsonl, LoadWarning};
/// # use std::path::Path;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let (store, warnings) = load_from_jsonl(Path::new(".keystone/dependencies.jsonl")).await?;
///
/// for warning in warnings {
///     match warning {
///         LoadWarning::MalformedJson { line_number, error } => {
///             eprintln!("Skipped malformed JSON at line {}: {}", line_number, error);
///         }
///         LoadWarning::SelfDependency { line_number, id } => {
///             eprintln!("Skipped self-dependency on {} at line {}", id, line_number);
///         }
///         LoadWarning::DuplicateDependency { line_number, dependent, dependency } => {
///             eprintln!("Skipped duplicate {} -> {} at line {}", dependent, dependency, line_number);
///         }
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line could not be parsed as an edge
    MalformedJson {
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// Edge pointing an item at itself
    SelfDependency {
        /// 1-based line number
        line_number: usize,
        /// The offending item
        id: WorkItemId,
    },

    /// Ordered pair already seen earlier in the file; the first one wins
    DuplicateDependency {
        /// 1-based line number
        line_number: usize,
        /// Dependent side of the pair
        dependent: WorkItemId,
        /// Dependency side of the pair
        dependency: WorkItemId,
    },
}

/// Load a dependency store from a JSONL file.
///
/// # Error Handling
///
/// - **Malformed JSON**: line skipped, `MalformedJson` warning
/// - **Self-dependency**: edge skipped, `SelfDependency` warning
/// - **Duplicate pair**: later edge skipped, `DuplicateDependency` warning
/// - **Blank lines**: ignored silently
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or read.
pub async fn load_from_jsonl(path: &Path) -> Result<(InMemoryDependencyStore, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut index = EdgeIndex::default();
    let mut warnings = Vec::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let edge: DependencyEdge = match serde_json::from_str(&line) {
            Ok(edge) => edge,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        match index.insert(edge) {
            Ok(_) => {}
            Err(Error::SelfDependency(id)) => {
                warnings.push(LoadWarning::SelfDependency { line_number, id });
            }
            Err(Error::DuplicateDependency {
                dependent,
                dependency,
            }) => {
                warnings.push(LoadWarning::DuplicateDependency {
                    line_number,
                    dependent,
                    dependency,
                });
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(
        path = %path.display(),
        edges = index.len(),
        warnings = warnings.len(),
        "Loaded dependency edges"
    );

    Ok((InMemoryDependencyStore::from_index(index), warnings))
}

/// Save a dependency store to a JSONL file with atomic writes.
///
/// Edges are written in insertion order so a reload reproduces the same
/// directional lookup order.
///
/// # Atomicity
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target. On POSIX systems an interrupted save leaves the original intact.
///
/// # Errors
///
/// Returns `Error::Io` on filesystem failures and `Error::Json` if an edge
/// cannot be serialized.
pub async fn save_to_jsonl(store: &dyn DependencyStore, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let file = File::create(&temp_path).await?;
    let mut writer = BufWriter::new(file);

    let edges = store.all().await?;
    for edge in &edges {
        let json = serde_json::to_string(edge)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;

    tokio::fs::rename(&temp_path, path).await?;

    tracing::debug!(path = %path.display(), edges = edges.len(), "Saved dependency edges");
    Ok(())
}
