//! Read-side views over task records.
//!
//! A day is `[00:00:00.000, 23:59:59.999]` in the configured zone. Results are
//! ordered by start time, then id.

use super::TaskService;
use crate::clock::{end_of_day, start_of_day};
use crate::error::{ApiError, ApiResult};
use crate::types::{
    AnnotatedTask, DateRange, Identity, MemberStatus, MemberTasks, Role, TaskRecord, UserSummary,
    duration_seconds,
};
use chrono::{DateTime, Duration, Utc};

impl TaskService {
    /// UTC bounds of an inclusive local date range.
    pub fn range_bounds(&self, range: DateRange) -> ApiResult<(DateTime<Utc>, DateTime<Utc>)> {
        if range.from > range.to {
            return Err(ApiError::invalid_value(
                "startDate",
                "startDate must not be after endDate",
            ));
        }
        let zone = self.clock.zone();
        Ok((start_of_day(zone, range.from), end_of_day(zone, range.to)))
    }

    /// The caller's tasks started today.
    pub fn today(&self, caller: &Identity) -> ApiResult<Vec<TaskRecord>> {
        let today = self.clock.today();
        self.owner_range(
            caller,
            Some(DateRange {
                from: today,
                to: today,
            }),
        )
    }

    /// The caller's tasks started in the last `days` local days, today included.
    pub fn trailing_window(&self, caller: &Identity, days: Option<u32>) -> ApiResult<Vec<TaskRecord>> {
        let days = days.unwrap_or(self.workday.recent_days);
        if days == 0 {
            return Err(ApiError::invalid_value("days", "days must be at least 1"));
        }
        let today = self.clock.today();
        let from = today
            .checked_sub_signed(Duration::days(i64::from(days) - 1))
            .ok_or_else(|| {
                ApiError::invalid_value("days", "days reaches past the supported calendar")
            })?;
        self.owner_range(caller, Some(DateRange { from, to: today }))
    }

    /// The caller's tasks by start date; every task when no range is given.
    pub fn owner_range(
        &self,
        caller: &Identity,
        range: Option<DateRange>,
    ) -> ApiResult<Vec<TaskRecord>> {
        match range {
            Some(range) => {
                let (from, to) = self.range_bounds(range)?;
                Ok(self
                    .db
                    .tasks_for_owner_started_between(&caller.user_id, from, to)?)
            }
            None => Ok(self.db.tasks_for_owner(&caller.user_id)?),
        }
    }

    /// Every owner's tasks that started or ended inside the range. Admin only.
    pub fn all_in_range(&self, caller: &Identity, range: DateRange) -> ApiResult<Vec<AnnotatedTask>> {
        self.require_admin(caller)?;
        let (from, to) = self.range_bounds(range)?;
        Ok(self.db.tasks_touching_range(from, to)?)
    }

    /// One member's tasks by start date. Admin only.
    pub fn member_range(
        &self,
        caller: &Identity,
        user_id: &str,
        range: DateRange,
    ) -> ApiResult<MemberTasks> {
        self.require_admin(caller)?;
        let (from, to) = self.range_bounds(range)?;
        let member = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| ApiError::user_not_found(user_id))?;
        let tasks = self
            .db
            .tasks_for_owner_started_between(&member.id, from, to)?;
        Ok(MemberTasks {
            team_member: member.display_name(),
            tasks,
        })
    }

    /// Each team member with their open task, if any. Admin only.
    pub fn current_status(&self, caller: &Identity) -> ApiResult<Vec<MemberStatus>> {
        self.require_admin(caller)?;
        let now = self.clock.now();

        let members = self.db.list_users_by_role(Role::TeamMember)?;
        let mut rows = Vec::with_capacity(members.len());
        for member in &members {
            let active_task = self.db.open_task_for_owner(&member.id)?;
            let elapsed_seconds = active_task
                .as_ref()
                .map(|t| duration_seconds(t.start_time, now).max(0));
            rows.push(MemberStatus {
                user: UserSummary::from(member),
                active_task,
                elapsed_seconds,
            });
        }
        Ok(rows)
    }

    /// All users with the team-member role. Admin only.
    pub fn team_members(&self, caller: &Identity) -> ApiResult<Vec<UserSummary>> {
        self.require_admin(caller)?;
        Ok(self
            .db
            .list_users_by_role(Role::TeamMember)?
            .iter()
            .map(UserSummary::from)
            .collect())
    }
}
