//! Critical path service.
//!
//! [`CriticalPathService`] is the entry point embedding applications call.
//! It owns handles to both stores, snapshots them per request, and runs the
//! graph builder and scheduler over the snapshot without holding any lock.
//!
//! # Example
//!
//! ```no_run
//! use keystone::domain::{DependencyType, WorkItem};
//! use keystone::service::CriticalPathService;
//! use keystone::storage::in_memory::{InMemoryDependencyStore, InMemoryWorkItemStore};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let items = InMemoryWorkItemStore::with_items([
//!         WorkItem::new("schema", "Design schema", 2),
//!         WorkItem::new("api", "Build API", 3),
//!     ]);
//!     let service = CriticalPathService::new(
//!         Arc::new(items),
//!         Arc::new(InMemoryDependencyStore::new()),
//!     );
//!
//!     service
//!         .add_dependency(&"api".into(), &"schema".into(), DependencyType::Blocks, "alice")
//!         .await?;
//!
//!     for item in service.calculate_critical_path().await? {
//!         println!("{}: {}", item.id, item.title);
//!     }
//!     Ok(())
//! }
//! ```

use crate::config::EngineConfig;
use crate::domain::{
    BlockedInfo, DependencyDirection, DependencyEdge, DependencyType, WorkItem, WorkItemId,
};
use crate::error::{Error, Result};
use crate::graph::{GraphBuilder, ScopedGraph, ancestors_scope};
use crate::report::ReportSink;
use crate::schedule::{self, DelayImpact, Schedule};
use crate::storage::{DependencyStore, WorkItemStore, create_dependency_store};
use chrono::{Local, NaiveDate, Utc};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Dependency management and schedule analysis over injected stores.
pub struct CriticalPathService {
    /// Source of work items and their blocked flag
    work_items: Arc<dyn WorkItemStore>,

    /// Source of dependency edges
    dependencies: Arc<dyn DependencyStore>,

    /// Engine limits and defaults
    config: EngineConfig,

    /// Receives recalculated results after blocked-flag changes
    reporter: Option<Arc<dyn ReportSink>>,
}

impl std::fmt::Debug for CriticalPathService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriticalPathService")
            .field("config", &self.config)
            .field("work_items", &"<dyn WorkItemStore>")
            .field("dependencies", &"<dyn DependencyStore>")
            .field("reporter", &self.reporter.as_ref().map(|_| "<dyn ReportSink>"))
            .finish()
    }
}

/// Point-in-time copy of both stores.
struct Snapshot {
    items: BTreeMap<WorkItemId, WorkItem>,

    /// Only edges whose endpoints are both tracked work items
    edges: Vec<DependencyEdge>,
}

impl Snapshot {
    fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a WorkItemId>) -> Vec<WorkItem> {
        ids.into_iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect()
    }
}

impl CriticalPathService {
    /// Create a service with the default configuration.
    pub fn new(work_items: Arc<dyn WorkItemStore>, dependencies: Arc<dyn DependencyStore>) -> Self {
        Self {
            work_items,
            dependencies,
            config: EngineConfig::default(),
            reporter: None,
        }
    }

    /// Create a service whose dependency store is built from `config`.
    ///
    /// Relative data paths are resolved against `root_dir`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid configuration and `Error::Io`
    /// if an existing JSONL data file cannot be read.
    pub async fn from_config(
        work_items: Arc<dyn WorkItemStore>,
        config: EngineConfig,
        root_dir: &Path,
    ) -> Result<Self> {
        config.validate()?;
        let backend = config.storage.to_backend(root_dir)?;
        let dependencies = create_dependency_store(backend).await?;
        Ok(Self {
            work_items,
            dependencies,
            config,
            reporter: None,
        })
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a sink that receives fresh results after blocked-flag changes.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ReportSink>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Persist the dependency store.
    ///
    /// # Errors
    ///
    /// Propagates backend write failures.
    pub async fn save(&self) -> Result<()> {
        self.dependencies.save().await
    }

    // ========== Dependency management ==========

    /// Record that `dependent` depends on `dependency`.
    ///
    /// Cycles are not checked here; they surface when a calculation builds
    /// a graph containing one, or through [`Self::check_integrity`].
    ///
    /// # Errors
    ///
    /// - `Error::SelfDependency` if both ids are equal
    /// - `Error::WorkItemNotFound` if either item is unknown
    /// - `Error::DuplicateDependency` if the edge already exists
    pub async fn add_dependency(
        &self,
        dependent: &WorkItemId,
        dependency: &WorkItemId,
        dep_type: DependencyType,
        created_by: &str,
    ) -> Result<DependencyEdge> {
        if dependent == dependency {
            return Err(Error::SelfDependency(dependent.clone()));
        }
        for id in [dependent, dependency] {
            if !self.work_items.exists(id).await? {
                return Err(Error::WorkItemNotFound(id.clone()));
            }
        }

        let edge = self
            .dependencies
            .insert(DependencyEdge::new(
                dependent.clone(),
                dependency.clone(),
                dep_type,
                created_by,
            ))
            .await?;

        tracing::info!(
            dependent = %dependent,
            dependency = %dependency,
            dep_type = %dep_type,
            "Added dependency"
        );
        Ok(edge)
    }

    /// Remove the edge between two items. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn remove_dependency(
        &self,
        dependent: &WorkItemId,
        dependency: &WorkItemId,
    ) -> Result<bool> {
        let removed = self.dependencies.remove(dependent, dependency).await?;
        if removed {
            tracing::info!(dependent = %dependent, dependency = %dependency, "Removed dependency");
        }
        Ok(removed)
    }

    /// Edges touching `id`, in insertion order.
    ///
    /// `Incoming` lists what `id` waits on; `Outgoing` lists what waits on
    /// `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkItemNotFound` if `id` is unknown.
    pub async fn get_dependencies(
        &self,
        id: &WorkItemId,
        direction: DependencyDirection,
    ) -> Result<Vec<DependencyEdge>> {
        if !self.work_items.exists(id).await? {
            return Err(Error::WorkItemNotFound(id.clone()));
        }
        match direction {
            DependencyDirection::Incoming => self.dependencies.incoming(id).await,
            DependencyDirection::Outgoing => self.dependencies.outgoing(id).await,
        }
    }

    /// The edge from `dependent` to `dependency`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DependencyNotFound` if no such edge is recorded.
    pub async fn get_dependency(
        &self,
        dependent: &WorkItemId,
        dependency: &WorkItemId,
    ) -> Result<DependencyEdge> {
        self.dependencies
            .get(dependent, dependency)
            .await?
            .ok_or_else(|| Error::DependencyNotFound {
                dependent: dependent.clone(),
                dependency: dependency.clone(),
            })
    }

    /// Check whether `dependent` directly depends on `dependency`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn has_dependency(
        &self,
        dependent: &WorkItemId,
        dependency: &WorkItemId,
    ) -> Result<bool> {
        self.dependencies.has_dependency(dependent, dependency).await
    }

    // ========== Critical path ==========

    /// Project-wide schedule over every tracked work item.
    ///
    /// # Errors
    ///
    /// - `Error::CyclicDependency` if the tracked items contain a cycle
    /// - `Error::ScopeTooLarge` if there are more items than the configured limit
    pub async fn schedule(&self) -> Result<Schedule> {
        let snapshot = self.snapshot().await?;
        let (_, schedule) = self.plan_project(&snapshot)?;
        Ok(schedule)
    }

    /// The project-wide critical path, first item first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::schedule`].
    pub async fn calculate_critical_path(&self) -> Result<Vec<WorkItem>> {
        let snapshot = self.snapshot().await?;
        let (_, schedule) = self.plan_project(&snapshot)?;
        Ok(snapshot.resolve(schedule.critical_path()))
    }

    /// The critical path ending at `target`, considering only `target` and
    /// the items it transitively depends on.
    ///
    /// # Errors
    ///
    /// - `Error::WorkItemNotFound` if `target` is unknown
    /// - `Error::CyclicDependency` if the ancestors contain a cycle
    /// - `Error::ScopeTooLarge` if the ancestor set exceeds the limit
    pub async fn calculate_critical_path_to(&self, target: &WorkItemId) -> Result<Vec<WorkItem>> {
        let snapshot = self.snapshot().await?;
        if !snapshot.items.contains_key(target) {
            return Err(Error::WorkItemNotFound(target.clone()));
        }
        let scope = ancestors_scope(target, &snapshot.edges);
        let (_, schedule) = self.plan(&snapshot, scope)?;
        Ok(snapshot.resolve(schedule.critical_path()))
    }

    /// Chains of work that can proceed in parallel. The first chain is the
    /// critical path.
    ///
    /// # Errors
    ///
    /// Same as [`Self::schedule`].
    pub async fn identify_parallel_paths(&self) -> Result<Vec<Vec<WorkItem>>> {
        let snapshot = self.snapshot().await?;
        let (graph, schedule) = self.plan_project(&snapshot)?;
        let chains = schedule::parallel_paths(&graph, &schedule)?;
        Ok(chains.iter().map(|chain| snapshot.resolve(chain)).collect())
    }

    /// Estimated completion date of every non-closed item when work starts
    /// on `start`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::schedule`].
    pub async fn get_estimated_completion_dates(
        &self,
        start: NaiveDate,
    ) -> Result<BTreeMap<WorkItemId, NaiveDate>> {
        let snapshot = self.snapshot().await?;
        let (_, schedule) = self.plan_project(&snapshot)?;
        schedule::completion_dates(&schedule, snapshot.items.values(), start)
    }

    /// [`Self::get_estimated_completion_dates`] starting today.
    ///
    /// # Errors
    ///
    /// Same as [`Self::schedule`].
    pub async fn get_estimated_completion_dates_from_today(
        &self,
    ) -> Result<BTreeMap<WorkItemId, NaiveDate>> {
        self.get_estimated_completion_dates(Local::now().date_naive())
            .await
    }

    // ========== Blockers and impact ==========

    /// Blocked items with zero slack, ordered by (ES, id).
    ///
    /// # Errors
    ///
    /// Same as [`Self::schedule`].
    pub async fn identify_blockers(&self) -> Result<Vec<WorkItem>> {
        let snapshot = self.snapshot().await?;
        let (_, schedule) = self.plan_project(&snapshot)?;
        Ok(Self::blockers(&snapshot, &schedule))
    }

    /// Mark an item as blocked.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkItemNotFound` if the item is unknown.
    pub async fn mark_as_blocked(
        &self,
        id: &WorkItemId,
        reason: &str,
        blocked_by: Option<&str>,
    ) -> Result<WorkItem> {
        let info = BlockedInfo {
            reason: reason.to_string(),
            blocked_by: blocked_by.map(str::to_string),
            blocked_at: Utc::now(),
        };
        let item = self.work_items.set_blocked(id, info).await?;
        tracing::info!(id = %id, reason, "Marked work item as blocked");
        self.publish_reports().await;
        Ok(item)
    }

    /// Clear an item's blocked flag; a blocked item returns to `Open`.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkItemNotFound` if the item is unknown.
    pub async fn mark_as_unblocked(&self, id: &WorkItemId) -> Result<WorkItem> {
        let item = self.work_items.clear_blocked(id).await?;
        tracing::info!(id = %id, "Marked work item as unblocked");
        self.publish_reports().await;
        Ok(item)
    }

    /// Simulate `id` finishing `delay_days` late.
    ///
    /// # Errors
    ///
    /// - `Error::WorkItemNotFound` if `id` is unknown
    /// - otherwise same as [`Self::schedule`]
    pub async fn calculate_delay_impact(
        &self,
        id: &WorkItemId,
        delay_days: u64,
    ) -> Result<DelayImpact> {
        let snapshot = self.snapshot().await?;
        if !snapshot.items.contains_key(id) {
            return Err(Error::WorkItemNotFound(id.clone()));
        }
        let (graph, schedule) = self.plan_project(&snapshot)?;
        schedule::simulate_delay(&graph, &schedule, id, delay_days)
    }

    /// Non-closed items that more than one other item depends on, most
    /// dependents first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn find_blocking_items(&self) -> Result<Vec<WorkItem>> {
        let snapshot = self.snapshot().await?;

        let mut dependents: HashMap<&WorkItemId, HashSet<&WorkItemId>> = HashMap::new();
        for edge in &snapshot.edges {
            dependents
                .entry(&edge.dependency_id)
                .or_default()
                .insert(&edge.dependent_id);
        }

        let mut blocking: Vec<(usize, &WorkItem)> = snapshot
            .items
            .values()
            .filter(|item| !item.is_closed())
            .filter_map(|item| {
                let count = dependents.get(&item.id).map_or(0, HashSet::len);
                (count > 1).then_some((count, item))
            })
            .collect();
        blocking.sort_by(|a, b| (Reverse(a.0), &a.1.id).cmp(&(Reverse(b.0), &b.1.id)));

        Ok(blocking.into_iter().map(|(_, item)| item.clone()).collect())
    }

    /// Items that directly depend on `id`, in edge insertion order.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkItemNotFound` if `id` is unknown.
    pub async fn find_items_depending_on(&self, id: &WorkItemId) -> Result<Vec<WorkItem>> {
        if !self.work_items.exists(id).await? {
            return Err(Error::WorkItemNotFound(id.clone()));
        }

        let mut items = Vec::new();
        for edge in self.dependencies.outgoing(id).await? {
            if let Some(item) = self.work_items.get(&edge.dependent_id).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    // ========== Maintenance ==========

    /// Check every stored edge for cycles, including edges between items the
    /// work-item store no longer tracks.
    ///
    /// The scope size limit does not apply here.
    ///
    /// # Errors
    ///
    /// Returns `Error::CyclicDependency` naming the first cycle found.
    pub async fn check_integrity(&self) -> Result<()> {
        let edges = self.dependencies.all().await?;
        let scope: Vec<WorkItemId> = edges
            .iter()
            .flat_map(|edge| [edge.dependent_id.clone(), edge.dependency_id.clone()])
            .collect();

        GraphBuilder::new(usize::MAX).build(scope, &edges)?;
        tracing::debug!(edges = edges.len(), "Dependency store passed integrity check");
        Ok(())
    }

    // ========== Internals ==========

    async fn snapshot(&self) -> Result<Snapshot> {
        let items: BTreeMap<WorkItemId, WorkItem> = self
            .work_items
            .list()
            .await?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        let edges = self
            .dependencies
            .all()
            .await?
            .into_iter()
            .filter(|edge| {
                items.contains_key(&edge.dependent_id) && items.contains_key(&edge.dependency_id)
            })
            .collect();

        Ok(Snapshot { items, edges })
    }

    fn plan_project(&self, snapshot: &Snapshot) -> Result<(ScopedGraph, Schedule)> {
        self.plan(snapshot, snapshot.items.keys().cloned())
    }

    fn plan<I>(&self, snapshot: &Snapshot, scope: I) -> Result<(ScopedGraph, Schedule)>
    where
        I: IntoIterator<Item = WorkItemId>,
    {
        let graph = GraphBuilder::new(self.config.max_scope_nodes).build(scope, &snapshot.edges)?;

        let durations = graph
            .ids()
            .map(|id| {
                snapshot
                    .items
                    .get(id)
                    .map(|item| (id.clone(), item.duration_or(self.config.default_estimate_days)))
                    .ok_or_else(|| Error::WorkItemNotFound(id.clone()))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let schedule = Schedule::compute(&graph, &durations)?;
        Ok((graph, schedule))
    }

    fn blockers(snapshot: &Snapshot, schedule: &Schedule) -> Vec<WorkItem> {
        snapshot.resolve(
            schedule
                .critical_items()
                .into_iter()
                .map(|node| &node.id)
                .filter(|id| snapshot.items.get(*id).is_some_and(WorkItem::is_blocked)),
        )
    }

    /// Recompute and push results to the reporter, if one is attached.
    ///
    /// The blocked-flag change has already been applied, so a failing
    /// recalculation is logged rather than returned.
    async fn publish_reports(&self) {
        let Some(reporter) = &self.reporter else {
            return;
        };

        let snapshot = match self.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Could not snapshot stores for reporting");
                return;
            }
        };

        match self.plan_project(&snapshot) {
            Ok((_, schedule)) => {
                reporter.publish_schedule(&schedule);
                reporter.publish_blockers(&Self::blockers(&snapshot, &schedule));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not recalculate schedule for reporting");
            }
        }
    }
}
