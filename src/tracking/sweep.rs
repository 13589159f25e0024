//! Daily reconciliation of tasks left open.
//!
//! Under the default policy a task still open at the end-of-day hour of its own
//! start day is closed at that hour, however late the sweep actually runs.
//!
//! Completed tasks are never rewritten, even when they ended on a later local
//! day than they started. Moving such an end time back is an admin edit.

use super::TaskService;
use crate::clock::{at_local_hour, next_local_hour};
use crate::config::SweepPolicy;
use crate::error::ApiResult;
use crate::types::SweepReport;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// End time the sweep would assign to an open task, or `None` to leave it open.
pub fn sweep_end_time(
    policy: SweepPolicy,
    zone: Tz,
    end_of_day_hour: u32,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match policy {
        SweepPolicy::BackdateToCutoff => {
            let cutoff = at_local_hour(zone, start_time, end_of_day_hour);
            (now >= cutoff).then(|| cutoff.max(start_time))
        }
        SweepPolicy::CloseAtSweepTime => Some(now.max(start_time)),
    }
}

impl TaskService {
    /// Close stale open tasks for every owner.
    ///
    /// Each owner is written in one transaction; a failure for one owner is
    /// logged and the sweep moves on.
    pub fn run_sweep(&self) -> ApiResult<SweepReport> {
        let now = self.clock.now();
        let zone = self.clock.zone();
        let mut report = SweepReport::default();

        for owner_id in self.db.owners_with_open_tasks()? {
            report.owners_scanned += 1;

            let open = match self.db.open_tasks_for_owner(&owner_id) {
                Ok(open) => open,
                Err(e) => {
                    warn!(owner = %owner_id, error = %e, "Sweep could not read open tasks");
                    report.owners_failed += 1;
                    continue;
                }
            };

            let closes: Vec<_> = open
                .iter()
                .filter_map(|task| {
                    sweep_end_time(
                        self.workday.sweep_policy,
                        zone,
                        self.workday.end_of_day_hour,
                        task.start_time,
                        now,
                    )
                    .map(|end| (task.id.clone(), task.version, end))
                })
                .collect();

            if closes.is_empty() {
                debug!(owner = %owner_id, "Nothing to close");
                continue;
            }

            match self.db.close_tasks_for_owner(&owner_id, &closes, now) {
                Ok(closed) => {
                    report.owners_updated += 1;
                    report.tasks_closed += closed;
                }
                Err(e) => {
                    warn!(owner = %owner_id, error = %e, "Sweep failed for owner");
                    report.owners_failed += 1;
                }
            }
        }

        info!(
            owners_scanned = report.owners_scanned,
            owners_updated = report.owners_updated,
            owners_failed = report.owners_failed,
            tasks_closed = report.tasks_closed,
            "Reconciliation sweep finished"
        );
        Ok(report)
    }
}

/// Run the sweep every day at the configured local hour until `shutdown`
/// flips to true or its sender is dropped.
pub fn spawn_daily_sweep(
    service: Arc<TaskService>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sweep_hour = service.workday.sweep_hour;
        loop {
            let now = service.clock.now();
            let next = next_local_hour(service.clock.zone(), now, sweep_hour);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "Next reconciliation sweep scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Sweep scheduler shutting down");
                        break;
                    }
                    continue;
                }
            }

            let svc = Arc::clone(&service);
            match tokio::task::spawn_blocking(move || svc.run_sweep()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "Reconciliation sweep aborted"),
                Err(e) => error!(error = %e, "Reconciliation sweep panicked"),
            }
        }
    })
}
