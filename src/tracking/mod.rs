//! Task tracking service.
//!
//! Owns the lifecycle rules (start, complete, edit, delete, admin add), the
//! read-side aggregation queries and the daily reconciliation sweep. Every
//! operation takes the caller's [`Identity`]; scope checks happen here, not in
//! the HTTP layer.

mod lifecycle;
mod queries;
mod sweep;

pub use sweep::{spawn_daily_sweep, sweep_end_time};

use crate::clock::Clock;
use crate::config::{DEFAULT_TEAM, WorkdayConfig};
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::queues::QueueCatalog;
use crate::types::{Identity, TaskRecord};
use std::sync::Arc;

/// Shared handle to the tracking rules and their collaborators.
#[derive(Clone)]
pub struct TaskService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    queues: Arc<QueueCatalog>,
    workday: WorkdayConfig,
}

impl TaskService {
    pub fn new(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        queues: Arc<QueueCatalog>,
        workday: WorkdayConfig,
    ) -> Self {
        Self {
            db,
            clock,
            queues,
            workday,
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn queues(&self) -> &QueueCatalog {
        &self.queues
    }

    pub fn workday(&self) -> &WorkdayConfig {
        &self.workday
    }

    /// Load a task the caller may see. Another owner's task is reported as
    /// missing to non-admins.
    fn load_scoped(&self, caller: &Identity, task_id: &str) -> ApiResult<TaskRecord> {
        match self.db.get_task(task_id)? {
            Some(task) if caller.is_admin() || task.owner_id == caller.user_id => Ok(task),
            _ => Err(ApiError::task_not_found(task_id)),
        }
    }

    fn require_admin(&self, caller: &Identity) -> ApiResult<()> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// Team whose queue list applies to `owner_id`.
    fn owner_team(&self, caller: &Identity, owner_id: &str) -> ApiResult<String> {
        if owner_id == caller.user_id {
            return Ok(caller.team.clone());
        }
        Ok(self
            .db
            .get_user(owner_id)?
            .map(|u| u.team)
            .unwrap_or_else(|| DEFAULT_TEAM.to_string()))
    }
}
