//! Core types for the workforce tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

/// Role attached to an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    #[default]
    TeamMember,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::TeamMember => "teamMember",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teamMember" | "team_member" | "member" => Ok(Role::TeamMember),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A registered user. Owns a sub-collection of task records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub team: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id.clone(),
            role: self.role,
            team: self.team.clone(),
        }
    }
}

/// New user input for provisioning.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub team: String,
}

/// The authenticated caller, as supplied by the identity boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    pub team: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// One tracked unit of work.
///
/// `completed` and `time_spent_seconds` are derived from the timestamps and
/// are never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub owner_id: String,
    pub queue_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub comment: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Whole seconds between start and end; `None` while in progress.
    pub fn time_spent_seconds(&self) -> Option<i64> {
        self.end_time
            .map(|end| duration_seconds(self.start_time, end))
    }
}

/// Floor of the span in seconds. Negative when `end` precedes `start`.
pub fn duration_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds().div_euclid(1000)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecordWire<'a> {
    id: &'a str,
    owner_id: &'a str,
    queue_name: &'a str,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    completed: bool,
    time_spent_seconds: Option<i64>,
    comment: &'a str,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Serialize for TaskRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TaskRecordWire {
            id: &self.id,
            owner_id: &self.owner_id,
            queue_name: &self.queue_name,
            start_time: self.start_time,
            end_time: self.end_time,
            completed: self.is_completed(),
            time_spent_seconds: self.time_spent_seconds(),
            comment: &self.comment,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .serialize(serializer)
    }
}

/// Body of a start request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTask {
    #[serde(default, alias = "queue")]
    pub queue_name: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Admin-supplied task for another user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTask {
    #[serde(default, alias = "queue")]
    pub queue_name: String,
    #[serde(alias = "startDate")]
    pub start_time: DateTime<Utc>,
    #[serde(default, alias = "endDate")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Partial update of a task record. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, alias = "queue")]
    pub queue_name: Option<String>,
    /// Version the caller last read; mismatches fail with `Conflict`.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl TaskPatch {
    pub fn touches_timestamps(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}

/// A task annotated with its owner's display name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedTask {
    #[serde(flatten)]
    pub task: TaskRecord,
    pub team_member: String,
}

/// Tasks of one team member over a range.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTasks {
    pub team_member: String,
    pub tasks: Vec<TaskRecord>,
}

/// Public profile of a user, as shown in admin views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Real-time status row for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatus {
    pub user: UserSummary,
    pub active_task: Option<TaskRecord>,
    pub elapsed_seconds: Option<i64>,
}

/// Inclusive calendar-date range in the configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Result of one reconciliation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub owners_scanned: usize,
    pub owners_updated: usize,
    pub owners_failed: usize,
    pub tasks_closed: usize,
}

// =============================================================================
// Referral log
// =============================================================================

/// Category of an issue referral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    #[serde(rename = "Provider Directory")]
    ProviderDirectory,
    #[serde(rename = "Balance Billed Discount Amount")]
    BalanceBilledDiscountAmount,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::ProviderDirectory => "Provider Directory",
            IssueType::BalanceBilledDiscountAmount => "Balance Billed Discount Amount",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Provider Directory" => Some(IssueType::ProviderDirectory),
            "Balance Billed Discount Amount" => Some(IssueType::BalanceBilledDiscountAmount),
            _ => None,
        }
    }
}

/// Referral progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferralStatus {
    #[default]
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "Resolved")]
    Resolved,
}

impl ReferralStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferralStatus::InProgress => "In progress",
            ReferralStatus::Resolved => "Resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "In progress" => Some(ReferralStatus::InProgress),
            "Resolved" => Some(ReferralStatus::Resolved),
            _ => None,
        }
    }
}

/// An entry in the issue-referral log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: String,
    pub issue_type: Option<IssueType>,
    pub csi_id: String,
    pub fh_issue_id: Option<String>,
    pub file_link: Option<String>,
    pub status: ReferralStatus,
    pub notes: String,
    pub created_by: String,
    /// Creator display name, filled in by list queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of a referral create request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReferral {
    #[serde(default)]
    pub issue_type: Option<IssueType>,
    #[serde(default)]
    pub csi_id: String,
    #[serde(default)]
    pub fh_issue_id: Option<String>,
    #[serde(default)]
    pub file_link: Option<String>,
    #[serde(default)]
    pub status: Option<ReferralStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial referral update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralPatch {
    #[serde(default)]
    pub issue_type: Option<IssueType>,
    #[serde(default)]
    pub csi_id: Option<String>,
    #[serde(default)]
    pub fh_issue_id: Option<String>,
    #[serde(default)]
    pub file_link: Option<String>,
    #[serde(default)]
    pub status: Option<ReferralStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}
