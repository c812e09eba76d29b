//! Integration tests for access decisions at the lift.

mod common;

use chrono::{Duration, Utc};
use lift_access::credential;
use lift_access::{
    AccessConfig, AccessEvent, AccessGate, BroadcastPublisher, CreateVisitorAccessRequest,
};
use lift_core::context::AccessContext;
use lift_core::error::LiftError;
use lift_core::models::access_log::{AccessMethod, AccessOutcome, Accessor};
use lift_core::models::floor::Floor;
use lift_core::models::user::{Role, User};
use lift_core::models::visitor_access::VisitorAccess;
use lift_core::repository::AccessLogFilter;
use lift_db::repository::{
    SurrealAccessLogRepository, SurrealFloorPermissionRepository, SurrealFloorRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use uuid::Uuid;

struct Fixture {
    db: Surreal<Db>,
    host: User,
    floors: Vec<Floor>,
    publisher: BroadcastPublisher,
}

/// Host allowed on floors 3 and 5; floor 9 exists but is not granted.
async fn fixture() -> Fixture {
    let db = common::setup().await;
    let host = common::create_user(&db, "host@example.com", Role::Resident).await;
    let floors = common::create_floors(&db, &[3, 5, 9]).await;
    common::grant(&db, host.id, &[&floors[0], &floors[1]]).await;
    Fixture {
        db,
        host,
        floors,
        publisher: BroadcastPublisher::new(16),
    }
}

async fn issue(f: &Fixture, floors: &[&Floor], start_in: Duration) -> VisitorAccess {
    let start = Utc::now() + start_in;
    common::ledger(&f.db)
        .create_access(
            &AccessContext::resident(f.host.id),
            CreateVisitorAccessRequest {
                visitor_name: "Gate Visitor".into(),
                start_time: start,
                end_time: start + Duration::hours(2),
                floor_ids: floors.iter().map(|fl| fl.id).collect(),
            },
        )
        .await
        .unwrap()
}

async fn log_count(f: &Fixture) -> u64 {
    common::log_service(&f.db)
        .query(AccessLogFilter::default(), 1, None)
        .await
        .unwrap()
        .total
}

#[tokio::test]
async fn valid_credential_opens_and_counts_use() {
    let f = fixture().await;
    let access = issue(&f, &[&f.floors[0]], -Duration::minutes(5)).await;
    let mut events = f.publisher.subscribe();
    let gate = common::gate(&f.db, f.publisher.clone(), common::test_config());

    let decision = gate
        .enter_with_credential(&access.qr_token, f.floors[0].id, Some("10.1.1.1".into()))
        .await
        .unwrap();
    assert!(decision.is_granted());
    assert_eq!(decision.log.accessor, Accessor::Visitor(access.id));
    assert_eq!(decision.log.method, AccessMethod::Qr);
    assert_eq!(decision.log.ip_address.as_deref(), Some("10.1.1.1"));

    let reloaded = common::ledger(&f.db)
        .get_by_id(access.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.use_count, 1);
    assert!(reloaded.first_used_at.is_some());
    assert_eq!(reloaded.first_used_at, reloaded.last_used_at);

    match events.try_recv().unwrap() {
        AccessEvent::OccupantEntered {
            accessor, floor_id, ..
        } => {
            assert_eq!(accessor, Accessor::Visitor(access.id));
            assert_eq!(floor_id, f.floors[0].id);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn scanned_uri_is_accepted() {
    let f = fixture().await;
    let access = issue(&f, &[&f.floors[0]], Duration::zero()).await;
    let gate = common::gate(&f.db, f.publisher.clone(), common::test_config());

    let decision = gate
        .enter_with_credential(
            &credential::credential_payload(&access.qr_token),
            f.floors[0].id,
            None,
        )
        .await
        .unwrap();
    assert!(decision.is_granted());
}

#[tokio::test]
async fn denials_are_logged_with_reasons() {
    let f = fixture().await;
    let pending = issue(&f, &[&f.floors[0]], Duration::hours(1)).await;
    let active = issue(&f, &[&f.floors[0]], -Duration::minutes(1)).await;
    let mut events = f.publisher.subscribe();
    let gate = common::gate(&f.db, f.publisher.clone(), common::test_config());

    let early = gate
        .enter_with_credential(&pending.qr_token, f.floors[0].id, None)
        .await
        .unwrap();
    assert_eq!(early.outcome, AccessOutcome::Denied);
    assert!(early.reason.is_some());

    let wrong_floor = gate
        .enter_with_credential(&active.qr_token, f.floors[1].id, None)
        .await
        .unwrap();
    assert_eq!(wrong_floor.outcome, AccessOutcome::Denied);

    assert_eq!(log_count(&f).await, 2);
    assert!(events.try_recv().is_err(), "denials announce nothing");

    let untouched = common::ledger(&f.db)
        .get_by_id(active.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.use_count, 0);
}

#[tokio::test]
async fn unknown_credential_is_not_found_and_not_logged() {
    let f = fixture().await;
    let gate = common::gate(&f.db, f.publisher.clone(), common::test_config());

    let err = gate
        .enter_with_credential("not-a-token", f.floors[0].id, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(log_count(&f).await, 0);
}

#[tokio::test]
async fn revocation_only_matters_when_rechecking() {
    let f = fixture().await;
    let access = issue(&f, &[&f.floors[0]], -Duration::minutes(1)).await;
    common::revoke(&f.db, f.host.id, &f.floors[0]).await;

    let lenient = common::gate(&f.db, f.publisher.clone(), common::test_config());
    let decision = lenient
        .enter_with_credential(&access.qr_token, f.floors[0].id, None)
        .await
        .unwrap();
    assert!(decision.is_granted(), "issuance-time check only");

    let strict = common::gate(
        &f.db,
        f.publisher.clone(),
        AccessConfig {
            recheck_permissions_on_use: true,
            ..common::test_config()
        },
    );
    let decision = strict
        .enter_with_credential(&access.qr_token, f.floors[0].id, None)
        .await
        .unwrap();
    assert_eq!(decision.outcome, AccessOutcome::Denied);
}

#[tokio::test]
async fn inactive_floor_denies_visitor() {
    let f = fixture().await;
    let access = issue(&f, &[&f.floors[0]], -Duration::minutes(1)).await;
    common::deactivate_floor(&f.db, f.floors[0].id).await;
    let gate = common::gate(&f.db, f.publisher.clone(), common::test_config());

    let decision = gate
        .enter_with_credential(&access.qr_token, f.floors[0].id, None)
        .await
        .unwrap();
    assert_eq!(decision.outcome, AccessOutcome::Denied);
}

#[tokio::test]
async fn residents_enter_permitted_floors_only() {
    let f = fixture().await;
    let gate = common::gate(&f.db, f.publisher.clone(), common::test_config());

    let allowed = gate
        .enter_as_resident(f.host.id, f.floors[1].id, AccessMethod::Nfc, None)
        .await
        .unwrap();
    assert!(allowed.is_granted());
    assert_eq!(allowed.log.accessor, Accessor::User(f.host.id));

    let denied = gate
        .enter_as_resident(f.host.id, f.floors[2].id, AccessMethod::Fingerprint, None)
        .await
        .unwrap();
    assert_eq!(denied.outcome, AccessOutcome::Denied);

    let err = gate
        .enter_as_resident(f.host.id, f.floors[1].id, AccessMethod::Qr, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LiftError::Validation { .. }));

    common::deactivate_user(&f.db, f.host.id).await;
    let inactive = gate
        .enter_as_resident(f.host.id, f.floors[1].id, AccessMethod::Nfc, None)
        .await
        .unwrap();
    assert_eq!(inactive.outcome, AccessOutcome::Denied);

    assert_eq!(log_count(&f).await, 3);
}

#[tokio::test]
async fn overrides_require_an_admin() {
    let f = fixture().await;
    let admin = common::create_user(&f.db, "admin@example.com", Role::Admin).await;
    let gate = common::gate(&f.db, f.publisher.clone(), common::test_config());

    let granted = gate
        .admin_override(
            &AccessContext::admin(admin.id),
            f.floors[2].id,
            "elevator maintenance",
            None,
        )
        .await
        .unwrap();
    assert!(granted.is_granted());
    assert_eq!(granted.log.method, AccessMethod::AdminOverride);
    assert_eq!(granted.log.reason.as_deref(), Some("elevator maintenance"));

    let refused = gate
        .admin_override(
            &AccessContext::resident(f.host.id),
            f.floors[2].id,
            "let me in",
            None,
        )
        .await
        .unwrap();
    assert_eq!(refused.outcome, AccessOutcome::Denied);

    let err = gate
        .admin_override(&AccessContext::admin(admin.id), f.floors[2].id, "  ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LiftError::Validation { .. }));

    let err = gate
        .admin_override(&AccessContext::admin(admin.id), Uuid::new_v4(), "x", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn exits_are_announced() {
    let f = fixture().await;
    let mut events = f.publisher.subscribe();
    let gate = common::gate(&f.db, f.publisher.clone(), common::test_config());

    gate.report_exit(Accessor::User(f.host.id), f.floors[0].id);

    assert!(matches!(
        events.try_recv().unwrap(),
        AccessEvent::OccupantExited { .. }
    ));
}

#[tokio::test]
async fn uncounted_use_is_logged_as_denied() {
    let f = fixture().await;
    let access = issue(&f, &[&f.floors[0]], -Duration::minutes(5)).await;
    let accesses = common::FaultyAccesses::new(&f.db).failing_record_use();
    let mut events = f.publisher.subscribe();
    let gate = AccessGate::new(
        SurrealUserRepository::new(f.db.clone()),
        SurrealFloorRepository::new(f.db.clone()),
        SurrealFloorPermissionRepository::new(f.db.clone()),
        &accesses,
        SurrealAccessLogRepository::new(f.db.clone()),
        f.publisher.clone(),
        common::test_config(),
    );

    let decision = gate
        .enter_with_credential(&access.qr_token, f.floors[0].id, None)
        .await
        .unwrap();
    assert!(!decision.is_granted());
    assert_eq!(decision.log.outcome, AccessOutcome::Denied);
    assert!(decision.reason.is_some());
    assert!(events.try_recv().is_err(), "nothing announced");

    let granted = common::log_service(&f.db)
        .query(
            AccessLogFilter {
                outcome: Some(AccessOutcome::Successful),
                ..Default::default()
            },
            1,
            None,
        )
        .await
        .unwrap();
    assert_eq!(granted.total, 0);
}
