//! Referral log storage.

use super::{Database, from_ms, to_ms};
use crate::types::{IssueType, Referral, ReferralStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

const REFERRAL_COLUMNS: &str = "r.id, r.issue_type, r.csi_id, r.fh_issue_id, r.file_link, r.status, r.notes, r.created_by, r.created_at, r.updated_at";

fn parse_referral_row(row: &Row, with_name: bool) -> rusqlite::Result<Referral> {
    let issue_type: Option<String> = row.get("issue_type")?;
    let status: String = row.get("status")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;

    let created_by_name = if with_name {
        let first: Option<String> = row.get("first_name")?;
        let last: Option<String> = row.get("last_name")?;
        match (first, last) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            _ => None,
        }
    } else {
        None
    };

    Ok(Referral {
        id: row.get("id")?,
        issue_type: issue_type.as_deref().and_then(IssueType::parse),
        csi_id: row.get("csi_id")?,
        fh_issue_id: row.get("fh_issue_id")?,
        file_link: row.get("file_link")?,
        status: ReferralStatus::parse(&status).unwrap_or_default(),
        notes: row.get("notes")?,
        created_by: row.get("created_by")?,
        created_by_name,
        created_at: from_ms(created_at),
        updated_at: from_ms(updated_at),
    })
}

impl Database {
    pub fn insert_referral(&self, referral: &Referral) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO referrals (id, issue_type, csi_id, fh_issue_id, file_link, status, notes, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    &referral.id,
                    referral.issue_type.map(IssueType::as_str),
                    &referral.csi_id,
                    &referral.fh_issue_id,
                    &referral.file_link,
                    referral.status.as_str(),
                    &referral.notes,
                    &referral.created_by,
                    to_ms(referral.created_at),
                    to_ms(referral.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_referral(&self, referral_id: &str) -> Result<Option<Referral>> {
        self.with_conn(|conn| {
            let referral = conn
                .query_row(
                    &format!(
                        "SELECT {}, u.first_name, u.last_name FROM referrals r
                         LEFT JOIN users u ON u.id = r.created_by
                         WHERE r.id = ?1",
                        REFERRAL_COLUMNS
                    ),
                    params![referral_id],
                    |row| parse_referral_row(row, true),
                )
                .optional()?;
            Ok(referral)
        })
    }

    /// All referrals, newest first, with the creator's display name.
    pub fn list_referrals(&self) -> Result<Vec<Referral>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}, u.first_name, u.last_name FROM referrals r
                 LEFT JOIN users u ON u.id = r.created_by
                 ORDER BY r.created_at DESC, r.id DESC",
                REFERRAL_COLUMNS
            ))?;
            let referrals = stmt
                .query_map([], |row| parse_referral_row(row, true))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(referrals)
        })
    }

    /// Write back every mutable field. Returns false when the row is gone.
    pub fn update_referral(&self, referral: &Referral) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE referrals SET issue_type = ?1, csi_id = ?2, fh_issue_id = ?3, file_link = ?4,
                        status = ?5, notes = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    referral.issue_type.map(IssueType::as_str),
                    &referral.csi_id,
                    &referral.fh_issue_id,
                    &referral.file_link,
                    referral.status.as_str(),
                    &referral.notes,
                    to_ms(referral.updated_at),
                    &referral.id,
                ],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn delete_referral(&self, referral_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted =
                conn.execute("DELETE FROM referrals WHERE id = ?1", params![referral_id])?;
            Ok(deleted > 0)
        })
    }

    /// In-progress referrals not touched since `cutoff`, oldest first.
    pub fn referrals_due(&self, cutoff: DateTime<Utc>) -> Result<Vec<Referral>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}, u.first_name, u.last_name FROM referrals r
                 LEFT JOIN users u ON u.id = r.created_by
                 WHERE r.status = ?1 AND r.updated_at <= ?2
                 ORDER BY r.updated_at, r.id",
                REFERRAL_COLUMNS
            ))?;
            let referrals = stmt
                .query_map(
                    params![ReferralStatus::InProgress.as_str(), to_ms(cutoff)],
                    |row| parse_referral_row(row, true),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(referrals)
        })
    }
}
