//! Integration tests for the database layer.
//!
//! These tests verify storage behavior directly, below the service rules.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use workforce_tracker::db::Database;
use workforce_tracker::types::{IssueType, NewUser, Referral, ReferralStatus, Role, TaskRecord};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn t(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
}

fn create_user(db: &Database, email: &str) -> String {
    db.create_user(
        &NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            role: Role::TeamMember,
            team: "default".into(),
        },
        t(8, 0),
    )
    .expect("Failed to create user")
    .id
}

fn task(id: &str, owner: &str, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> TaskRecord {
    TaskRecord {
        id: id.into(),
        owner_id: owner.into(),
        queue_name: "Meeting".into(),
        start_time: start,
        end_time: end,
        comment: String::new(),
        version: 1,
        created_at: start,
        updated_at: start,
    }
}

mod file_tests {
    use super::*;

    #[test]
    fn reopening_keeps_data_and_skips_applied_migrations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.db");

        let owner = {
            let db = Database::open(&path).unwrap();
            let owner = create_user(&db, "ada@example.com");
            db.insert_task(&task("t1", &owner, t(9, 0), None)).unwrap();
            owner
        };

        let db = Database::open(&path).unwrap();
        let open = db.open_task_for_owner(&owner).unwrap().unwrap();
        assert_eq!(open.id, "t1");
        assert_eq!(open.start_time, t(9, 0));
    }
}

mod task_storage_tests {
    use super::*;

    #[test]
    fn end_before_start_violates_check() {
        let db = setup_db();
        let owner = create_user(&db, "ada@example.com");
        assert!(
            db.insert_task(&task("bad", &owner, t(10, 0), Some(t(9, 0))))
                .is_err()
        );
    }

    #[test]
    fn unknown_owner_violates_foreign_key() {
        let db = setup_db();
        assert!(db.insert_task(&task("t1", "ghost", t(9, 0), None)).is_err());
    }

    #[test]
    fn owners_with_open_tasks_lists_each_once() {
        let db = setup_db();
        let a = create_user(&db, "a@example.com");
        let b = create_user(&db, "b@example.com");
        db.insert_task(&task("a1", &a, t(9, 0), None)).unwrap();
        db.insert_task(&task("a0", &a, t(7, 0), Some(t(8, 0)))).unwrap();
        db.insert_task(&task("b0", &b, t(7, 0), Some(t(8, 0)))).unwrap();

        assert_eq!(db.owners_with_open_tasks().unwrap(), vec![a]);
    }

    #[test]
    fn started_between_is_inclusive_and_ordered() {
        let db = setup_db();
        let owner = create_user(&db, "ada@example.com");
        db.insert_task(&task("b", &owner, t(10, 0), Some(t(11, 0)))).unwrap();
        db.insert_task(&task("a", &owner, t(9, 0), Some(t(10, 0)))).unwrap();
        db.insert_task(&task("c", &owner, t(12, 0), None)).unwrap();

        let tasks = db
            .tasks_for_owner_started_between(&owner, t(9, 0), t(10, 0))
            .unwrap();
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn deleting_user_removes_their_tasks() {
        let db = setup_db();
        let owner = create_user(&db, "ada@example.com");
        db.insert_task(&task("t1", &owner, t(9, 0), None)).unwrap();

        db.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [&owner])?;
            Ok(())
        })
        .unwrap();
        assert!(db.get_task("t1").unwrap().is_none());
    }
}

mod referral_storage_tests {
    use super::*;

    fn referral(id: &str, created_by: &str, updated_at: DateTime<Utc>) -> Referral {
        Referral {
            id: id.into(),
            issue_type: Some(IssueType::BalanceBilledDiscountAmount),
            csi_id: "1234567".into(),
            fh_issue_id: None,
            file_link: None,
            status: ReferralStatus::InProgress,
            notes: String::new(),
            created_by: created_by.into(),
            created_by_name: None,
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn roundtrip_keeps_enums() {
        let db = setup_db();
        let admin = create_user(&db, "admin@example.com");
        db.insert_referral(&referral("r1", &admin, t(9, 0))).unwrap();

        let stored = db.get_referral("r1").unwrap().unwrap();
        assert_eq!(stored.issue_type, Some(IssueType::BalanceBilledDiscountAmount));
        assert_eq!(stored.status, ReferralStatus::InProgress);
        assert_eq!(stored.created_by_name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn due_filters_by_status_and_age() {
        let db = setup_db();
        let admin = create_user(&db, "admin@example.com");
        let old = t(9, 0) - Duration::days(12);

        db.insert_referral(&referral("old", &admin, old)).unwrap();
        db.insert_referral(&referral("fresh", &admin, t(9, 0))).unwrap();
        let mut resolved = referral("resolved", &admin, old);
        resolved.status = ReferralStatus::Resolved;
        db.insert_referral(&resolved).unwrap();

        let due = db.referrals_due(t(9, 0) - Duration::days(10)).unwrap();
        let ids: Vec<_> = due.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["old"]);
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let db = setup_db();
        let admin = create_user(&db, "admin@example.com");
        let mut r = referral("r1", &admin, t(9, 0));
        assert!(!db.update_referral(&r).unwrap());

        db.insert_referral(&r).unwrap();
        r.notes = "followed up".into();
        assert!(db.update_referral(&r).unwrap());
        assert_eq!(db.get_referral("r1").unwrap().unwrap().notes, "followed up");

        assert!(db.delete_referral("r1").unwrap());
        assert!(!db.delete_referral("r1").unwrap());
    }
}
