//! Reporting sink for computed results.
//!
//! The service pushes fresh schedules and blocker lists to an optional
//! [`ReportSink`] after blocked-flag changes. Formatting and transport are
//! up to the sink.

use crate::domain::{WorkItem, WorkItemId};
use crate::schedule::Schedule;

/// Receiver of recalculated results.
pub trait ReportSink: Send + Sync {
    /// A project-wide schedule was recomputed.
    fn publish_schedule(&self, schedule: &Schedule);

    /// The blockers on the critical path were recomputed.
    fn publish_blockers(&self, blockers: &[WorkItem]);
}

/// Sink that emits results as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ReportSink for TracingReporter {
    fn publish_schedule(&self, schedule: &Schedule) {
        tracing::info!(
            items = schedule.len(),
            project_finish = schedule.project_finish(),
            critical_path = ?schedule
                .critical_path()
                .iter()
                .map(WorkItemId::as_str)
                .collect::<Vec<_>>(),
            "Schedule updated"
        );
    }

    fn publish_blockers(&self, blockers: &[WorkItem]) {
        if blockers.is_empty() {
            tracing::info!("No blocked items on the critical path");
            return;
        }
        for item in blockers {
            tracing::info!(
                id = %item.id,
                title = %item.title,
                reason = item.blocked.as_ref().map(|b| b.reason.as_str()),
                "Blocked item on the critical path"
            );
        }
    }
}
