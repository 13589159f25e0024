//! Integration tests for the referral log.

use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::America::New_York;
use std::sync::Arc;
use workforce_tracker::clock::{Clock, FixedClock};
use workforce_tracker::db::Database;
use workforce_tracker::error::ErrorCode;
use workforce_tracker::referrals::ReferralService;
use workforce_tracker::types::{
    Identity, IssueType, NewReferral, NewUser, ReferralPatch, ReferralStatus, Role,
};

fn setup() -> (ReferralService, Arc<FixedClock>, Identity, Identity) {
    let db = Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"));
    let clock = Arc::new(FixedClock::at_local(
        New_York,
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        10,
        0,
    ));

    let mut ids = Vec::new();
    for (first, email, role) in [
        ("Alan", "alan@example.com", Role::Admin),
        ("Ada", "ada@example.com", Role::TeamMember),
    ] {
        let user = db
            .create_user(
                &NewUser {
                    first_name: first.into(),
                    last_name: "Tester".into(),
                    email: email.into(),
                    role,
                    team: "default".into(),
                },
                Utc::now(),
            )
            .expect("Failed to create user");
        ids.push(user.identity());
    }
    let member = ids.pop().unwrap();
    let admin = ids.pop().unwrap();

    let service = ReferralService::new(db, clock.clone(), 10);
    (service, clock, admin, member)
}

fn new_referral(csi_id: &str) -> NewReferral {
    NewReferral {
        issue_type: Some(IssueType::ProviderDirectory),
        csi_id: csi_id.into(),
        fh_issue_id: None,
        file_link: Some("https://files.example.com/ref/1".into()),
        status: None,
        notes: None,
    }
}

mod crud_tests {
    use super::*;

    #[test]
    fn create_defaults_to_in_progress() {
        let (service, clock, admin, _) = setup();
        let referral = service.create(&admin, new_referral("1234567")).unwrap();

        assert_eq!(referral.status, ReferralStatus::InProgress);
        assert_eq!(referral.created_by, admin.user_id);
        assert_eq!(referral.created_at, clock.now());
        assert_eq!(referral.notes, "");
    }

    #[test]
    fn list_is_newest_first_with_creator_name() {
        let (service, clock, admin, _) = setup();
        let older = service.create(&admin, new_referral("1111111")).unwrap();
        clock.advance(Duration::minutes(1));
        let newer = service.create(&admin, new_referral("2222222")).unwrap();

        let listed = service.list(&admin).unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
        assert_eq!(listed[0].created_by_name.as_deref(), Some("Alan Tester"));
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let (service, _, admin, _) = setup();

        let err = service.create(&admin, new_referral("12345")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.field.as_deref(), Some("csiId"));

        let mut bad_fh = new_referral("1234567");
        bad_fh.fh_issue_id = Some("123".into());
        let err = service.create(&admin, bad_fh).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("fhIssueId"));

        let mut bad_link = new_referral("1234567");
        bad_link.file_link = Some("not a url".into());
        let err = service.create(&admin, bad_link).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("fileLink"));
    }

    #[test]
    fn update_revalidates_and_bumps_updated_at() {
        let (service, clock, admin, _) = setup();
        let referral = service.create(&admin, new_referral("1234567")).unwrap();
        clock.advance(Duration::hours(2));

        let updated = service
            .update(
                &admin,
                &referral.id,
                ReferralPatch {
                    status: Some(ReferralStatus::Resolved),
                    fh_issue_id: Some("87654321".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, ReferralStatus::Resolved);
        assert_eq!(updated.fh_issue_id.as_deref(), Some("87654321"));
        assert_eq!(updated.updated_at, clock.now());
        assert_eq!(updated.created_at, referral.created_at);

        let err = service
            .update(
                &admin,
                &referral.id,
                ReferralPatch {
                    csi_id: Some("abc".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (service, _, admin, _) = setup();
        let referral = service.create(&admin, new_referral("1234567")).unwrap();

        service.delete(&admin, &referral.id).unwrap();
        let err = service.delete(&admin, &referral.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn members_are_forbidden() {
        let (service, _, _, member) = setup();
        assert_eq!(
            service
                .create(&member, new_referral("1234567"))
                .unwrap_err()
                .code,
            ErrorCode::Forbidden
        );
        assert_eq!(
            service.list(&member).unwrap_err().code,
            ErrorCode::Forbidden
        );
        assert_eq!(
            service.due_for_update(&member).unwrap_err().code,
            ErrorCode::Forbidden
        );
    }
}

mod due_tests {
    use super::*;

    #[test]
    fn due_after_ten_days_without_update() {
        let (service, clock, admin, _) = setup();
        let stale = service.create(&admin, new_referral("1111111")).unwrap();
        clock.advance(Duration::days(5));
        service.create(&admin, new_referral("2222222")).unwrap();

        clock.advance(Duration::days(5));
        let due = service.due_for_update(&admin).unwrap();
        let ids: Vec<_> = due.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![stale.id.as_str()]);
    }

    #[test]
    fn resolved_referrals_are_never_due() {
        let (service, clock, admin, _) = setup();
        let referral = service.create(&admin, new_referral("1111111")).unwrap();
        service
            .update(
                &admin,
                &referral.id,
                ReferralPatch {
                    status: Some(ReferralStatus::Resolved),
                    ..Default::default()
                },
            )
            .unwrap();

        clock.advance(Duration::days(30));
        assert!(service.due_for_update(&admin).unwrap().is_empty());
    }

    #[test]
    fn update_resets_the_clock() {
        let (service, clock, admin, _) = setup();
        let referral = service.create(&admin, new_referral("1111111")).unwrap();
        clock.advance(Duration::days(9));
        service
            .update(
                &admin,
                &referral.id,
                ReferralPatch {
                    notes: Some("called provider".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        clock.advance(Duration::days(9));
        assert!(service.due_for_update(&admin).unwrap().is_empty());
        clock.advance(Duration::days(1));
        assert_eq!(service.due_for_update(&admin).unwrap().len(), 1);
    }
}
