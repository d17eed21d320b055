//! In-memory storage backends.
//!
//! This module provides fast, **ephemeral** stores where all data is held in
//! RAM and **lost when the process exits**, plus optional JSONL persistence
//! for dependency edges via [`load_from_jsonl`] and [`save_to_jsonl`].
//!
//! # Edge Direction Convention
//!
//! Edges are recorded as **dependent -> dependency**:
//!
//! - If `api` cannot start until `schema` is done, the edge is
//!   `api -> schema` with type `Blocks`
//! - `incoming(api)` lists the edges `api` waits on
//! - `outgoing(schema)` lists the edges waiting on `schema`
//!
//! # Thread Safety
//!
//! Each store wraps its data in `Arc<RwLock<_>>`. Lookups and snapshots take
//! a short read lock; graph construction happens on the returned snapshot
//! after the lock is released, so a long calculation never holds up writers.
//!
//! # Performance Characteristics
//!
//! - Insert: O(1) amortized (duplicate check via hash set)
//! - Remove: O(e) where e is the number of edges
//! - Directional lookup: O(e)
//! - Snapshot: O(e)

mod dependencies;
mod edges;
mod jsonl;
mod work_items;

pub use dependencies::InMemoryDependencyStore;
pub use jsonl::{load_from_jsonl, save_to_jsonl, LoadWarning};
pub use work_items::InMemoryWorkItemStore;
