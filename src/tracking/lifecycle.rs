//! Start, complete, edit, delete and admin-add.

use super::TaskService;
use crate::error::{ApiError, ApiResult};
use crate::types::{AddTask, Identity, StartTask, TaskPatch, TaskRecord};
use tracing::{debug, info};
use uuid::Uuid;

impl TaskService {
    /// Open a new task for the caller at the current instant.
    pub fn start(&self, caller: &Identity, request: StartTask) -> ApiResult<TaskRecord> {
        let queue_name = self.queues.validate(&caller.team, &request.queue_name)?;

        if let Some(open) = self.db.open_task_for_owner(&caller.user_id)? {
            return Err(ApiError::open_task_exists(&open.id));
        }

        let now = self.clock.now();
        let task = TaskRecord {
            id: Uuid::now_v7().to_string(),
            owner_id: caller.user_id.clone(),
            queue_name,
            start_time: now,
            end_time: None,
            comment: request.comment.unwrap_or_default(),
            version: 1,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_task(&task)?;
        info!(task_id = %task.id, owner = %task.owner_id, queue = %task.queue_name, "Task started");
        Ok(task)
    }

    /// Close a task at the current instant.
    pub fn complete(&self, caller: &Identity, task_id: &str) -> ApiResult<TaskRecord> {
        let task = self.load_scoped(caller, task_id)?;
        if task.is_completed() {
            return Err(ApiError::already_completed(task_id));
        }

        let now = self.clock.now();
        if now < task.start_time {
            return Err(ApiError::invalid_value(
                "endTime",
                "Task cannot end before it starts",
            ));
        }

        let mut closed = task.clone();
        closed.end_time = Some(now);
        let stored = self.db.update_task(&closed, task.version, now)?;

        info!(
            task_id = %stored.id,
            owner = %stored.owner_id,
            seconds = stored.time_spent_seconds().unwrap_or_default(),
            "Task completed"
        );
        Ok(stored)
    }

    /// Apply a partial update.
    ///
    /// Owners may only touch the comment and queue of their own open task.
    /// When a new start lands after the end, the end is pulled forward to the
    /// start; an end alone that precedes the start is rejected.
    pub fn edit(&self, caller: &Identity, task_id: &str, patch: TaskPatch) -> ApiResult<TaskRecord> {
        let task = self.load_scoped(caller, task_id)?;

        if !caller.is_admin() && (patch.touches_timestamps() || task.is_completed()) {
            return Err(ApiError::forbidden());
        }

        if let Some(expected) = patch.expected_version
            && expected != task.version
        {
            return Err(ApiError::version_conflict(task_id, expected, task.version));
        }

        let mut next = task.clone();

        if let Some(queue_name) = &patch.queue_name {
            let team = self.owner_team(caller, &task.owner_id)?;
            next.queue_name = self.queues.validate(&team, queue_name)?;
        }
        if let Some(comment) = patch.comment {
            next.comment = comment;
        }
        if let Some(start) = patch.start_time {
            next.start_time = start;
        }
        if let Some(end) = patch.end_time {
            next.end_time = Some(end);
        }

        if let Some(end) = next.end_time
            && next.start_time > end
        {
            if patch.start_time.is_some() {
                debug!(task_id, "Clamping end time to new start time");
                next.end_time = Some(next.start_time);
            } else {
                return Err(ApiError::invalid_value(
                    "endTime",
                    "End time cannot be before start time",
                ));
            }
        }

        if next == task {
            return Ok(task);
        }

        let now = self.clock.now();
        let stored = self.db.update_task(&next, task.version, now)?;
        info!(task_id = %stored.id, editor = %caller.user_id, version = stored.version, "Task edited");
        Ok(stored)
    }

    /// Remove a task permanently. Admin only.
    pub fn delete(&self, caller: &Identity, task_id: &str) -> ApiResult<()> {
        self.require_admin(caller)?;
        if !self.db.delete_task(task_id)? {
            return Err(ApiError::task_not_found(task_id));
        }
        info!(task_id, admin = %caller.user_id, "Task deleted");
        Ok(())
    }

    /// Record a task on behalf of another user. Admin only.
    pub fn admin_add(
        &self,
        caller: &Identity,
        owner_id: &str,
        request: AddTask,
    ) -> ApiResult<TaskRecord> {
        self.require_admin(caller)?;

        let owner = self
            .db
            .get_user(owner_id)?
            .ok_or_else(|| ApiError::user_not_found(owner_id))?;
        let queue_name = self.queues.validate(&owner.team, &request.queue_name)?;

        if let Some(end) = request.end_time
            && end < request.start_time
        {
            return Err(ApiError::invalid_value(
                "endTime",
                "End time cannot be before start time",
            ));
        }

        if request.end_time.is_none()
            && let Some(open) = self.db.open_task_for_owner(&owner.id)?
        {
            return Err(ApiError::open_task_exists(&open.id));
        }

        let now = self.clock.now();
        let task = TaskRecord {
            id: Uuid::now_v7().to_string(),
            owner_id: owner.id.clone(),
            queue_name,
            start_time: request.start_time,
            end_time: request.end_time,
            comment: request.comment.unwrap_or_default(),
            version: 1,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_task(&task)?;
        info!(task_id = %task.id, owner = %owner.id, admin = %caller.user_id, "Task added by admin");
        Ok(task)
    }
}
