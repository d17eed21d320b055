//! Calendar projection of a schedule.

use super::Schedule;
use crate::domain::{WorkItem, WorkItemId};
use crate::error::{Error, Result};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Estimated completion date of every non-closed item: `start + EF` days.
///
/// Items missing from the schedule are skipped.
///
/// # Errors
///
/// Returns `Error::InternalInconsistency` if a date falls outside the
/// calendar range chrono supports.
pub fn completion_dates<'a>(
    schedule: &Schedule,
    items: impl IntoIterator<Item = &'a WorkItem>,
    start: NaiveDate,
) -> Result<BTreeMap<WorkItemId, NaiveDate>> {
    let mut dates = BTreeMap::new();
    for item in items {
        if item.is_closed() {
            continue;
        }
        let Some(timing) = schedule.node(&item.id) else {
            continue;
        };
        let date = start
            .checked_add_days(Days::new(timing.earliest_finish))
            .ok_or_else(|| {
                Error::InternalInconsistency(format!(
                    "completion date of {} is out of range",
                    item.id
                ))
            })?;
        dates.insert(item.id.clone(), date);
    }
    Ok(dates)
}
