//! Issue-referral log. Admin only.

use crate::clock::Clock;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{Identity, NewReferral, Referral, ReferralPatch};
use chrono::Duration;
use regex_lite::Regex;
use std::sync::{Arc, LazyLock};
use tracing::info;
use uuid::Uuid;

static CSI_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{7}$").unwrap());
static FH_ISSUE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{8}$").unwrap());
static FILE_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://.+").unwrap());

fn validate_csi_id(value: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::missing_field("csiId"));
    }
    if !CSI_ID.is_match(value) {
        return Err(ApiError::invalid_value(
            "csiId",
            "CSI ID must be exactly 7 digits",
        ));
    }
    Ok(value.to_string())
}

/// Blank optional fields are stored as absent.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_fh_issue_id(value: Option<String>) -> ApiResult<Option<String>> {
    match optional(value) {
        Some(v) if !FH_ISSUE_ID.is_match(&v) => Err(ApiError::invalid_value(
            "fhIssueId",
            "FH Issue ID must be exactly 8 digits",
        )),
        other => Ok(other),
    }
}

fn validate_file_link(value: Option<String>) -> ApiResult<Option<String>> {
    match optional(value) {
        Some(v) if !FILE_LINK.is_match(&v) => Err(ApiError::invalid_value(
            "fileLink",
            "File link must be an http(s) URL",
        )),
        other => Ok(other),
    }
}

#[derive(Clone)]
pub struct ReferralService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    stale_after_days: i64,
}

impl ReferralService {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, stale_after_days: i64) -> Self {
        Self {
            db,
            clock,
            stale_after_days,
        }
    }

    fn require_admin(caller: &Identity) -> ApiResult<()> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    pub fn create(&self, caller: &Identity, input: NewReferral) -> ApiResult<Referral> {
        Self::require_admin(caller)?;

        let now = self.clock.now();
        let referral = Referral {
            id: Uuid::now_v7().to_string(),
            issue_type: input.issue_type,
            csi_id: validate_csi_id(&input.csi_id)?,
            fh_issue_id: validate_fh_issue_id(input.fh_issue_id)?,
            file_link: validate_file_link(input.file_link)?,
            status: input.status.unwrap_or_default(),
            notes: input.notes.unwrap_or_default(),
            created_by: caller.user_id.clone(),
            created_by_name: None,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_referral(&referral)?;
        info!(referral_id = %referral.id, csi_id = %referral.csi_id, "Referral created");
        Ok(referral)
    }

    /// Every referral, newest first.
    pub fn list(&self, caller: &Identity) -> ApiResult<Vec<Referral>> {
        Self::require_admin(caller)?;
        Ok(self.db.list_referrals()?)
    }

    pub fn update(
        &self,
        caller: &Identity,
        referral_id: &str,
        patch: ReferralPatch,
    ) -> ApiResult<Referral> {
        Self::require_admin(caller)?;

        let mut referral = self
            .db
            .get_referral(referral_id)?
            .ok_or_else(|| ApiError::referral_not_found(referral_id))?;

        if let Some(issue_type) = patch.issue_type {
            referral.issue_type = Some(issue_type);
        }
        if let Some(csi_id) = patch.csi_id {
            referral.csi_id = validate_csi_id(&csi_id)?;
        }
        if patch.fh_issue_id.is_some() {
            referral.fh_issue_id = validate_fh_issue_id(patch.fh_issue_id)?;
        }
        if patch.file_link.is_some() {
            referral.file_link = validate_file_link(patch.file_link)?;
        }
        if let Some(status) = patch.status {
            referral.status = status;
        }
        if let Some(notes) = patch.notes {
            referral.notes = notes;
        }
        referral.updated_at = self.clock.now();

        if !self.db.update_referral(&referral)? {
            return Err(ApiError::referral_not_found(referral_id));
        }
        info!(referral_id, status = referral.status.as_str(), "Referral updated");
        Ok(referral)
    }

    pub fn delete(&self, caller: &Identity, referral_id: &str) -> ApiResult<()> {
        Self::require_admin(caller)?;
        if !self.db.delete_referral(referral_id)? {
            return Err(ApiError::referral_not_found(referral_id));
        }
        info!(referral_id, "Referral deleted");
        Ok(())
    }

    /// In-progress referrals not updated for `stale_after_days`.
    pub fn due_for_update(&self, caller: &Identity) -> ApiResult<Vec<Referral>> {
        Self::require_admin(caller)?;
        let cutoff = self.clock.now() - Duration::days(self.stale_after_days);
        Ok(self.db.referrals_due(cutoff)?)
    }
}
