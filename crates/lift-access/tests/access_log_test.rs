//! Integration tests for the access log service.

mod common;

use chrono::{Duration, Utc};
use lift_core::models::access_log::{AccessMethod, AccessOutcome, Accessor, CreateAccessLog};
use lift_core::repository::AccessLogFilter;
use uuid::Uuid;

fn attempt(floor_id: Uuid, outcome: AccessOutcome, minutes_ago: i64) -> CreateAccessLog {
    CreateAccessLog {
        accessor: Accessor::User(Uuid::new_v4()),
        floor_id,
        method: AccessMethod::Fingerprint,
        outcome,
        timestamp: Some(Utc::now() - Duration::minutes(minutes_ago)),
        reason: None,
        ip_address: Some("192.168.1.20".into()),
    }
}

#[tokio::test]
async fn denied_on_floor_newest_first() {
    let db = common::setup().await;
    let service = common::log_service(&db);
    let floors = common::create_floors(&db, &[3, 4]).await;
    let (three, four) = (floors[0].id, floors[1].id);

    for (floor, outcome, minutes_ago) in [
        (three, AccessOutcome::Denied, 50),
        (three, AccessOutcome::Successful, 40),
        (four, AccessOutcome::Denied, 30),
        (three, AccessOutcome::Denied, 20),
        (three, AccessOutcome::Denied, 10),
    ] {
        service
            .record(attempt(floor, outcome, minutes_ago))
            .await
            .unwrap();
    }

    let page = service
        .query(
            AccessLogFilter {
                outcome: Some(AccessOutcome::Denied),
                floor_id: Some(three),
                ..Default::default()
            },
            1,
            None,
        )
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 3);
    assert!(
        page.items
            .iter()
            .all(|l| l.floor_id == three && l.outcome == AccessOutcome::Denied)
    );
    assert!(
        page.items
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp)
    );
}

#[tokio::test]
async fn zero_page_size_still_returns_a_page() {
    let db = common::setup().await;
    let service = common::log_service(&db);
    let floor = Uuid::new_v4();

    for minutes_ago in [3, 2, 1] {
        service
            .record(attempt(floor, AccessOutcome::Successful, minutes_ago))
            .await
            .unwrap();
    }

    let page = service
        .query(AccessLogFilter::default(), 0, Some(0))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total, 3);
    assert_eq!(page.page(), 1);
    assert_eq!(page.total_pages(), 3);
}

#[tokio::test]
async fn page_beyond_range_is_empty() {
    let db = common::setup().await;
    let service = common::log_service(&db);
    let floor = Uuid::new_v4();

    for minutes_ago in [2, 1] {
        service
            .record(attempt(floor, AccessOutcome::Denied, minutes_ago))
            .await
            .unwrap();
    }

    let page = service
        .query(AccessLogFilter::default(), u64::MAX, Some(50))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 2);
    assert_eq!(page.limit, 50);
}

#[tokio::test]
async fn method_and_user_filters_combine() {
    let db = common::setup().await;
    let service = common::log_service(&db);
    let floor = Uuid::new_v4();
    let user = Uuid::new_v4();

    let mut nfc = attempt(floor, AccessOutcome::Successful, 5);
    nfc.accessor = Accessor::User(user);
    nfc.method = AccessMethod::Nfc;
    service.record(nfc).await.unwrap();

    let mut fingerprint = attempt(floor, AccessOutcome::Successful, 4);
    fingerprint.accessor = Accessor::User(user);
    service.record(fingerprint).await.unwrap();

    service
        .record(attempt(floor, AccessOutcome::Successful, 3))
        .await
        .unwrap();

    let page = service
        .query(
            AccessLogFilter {
                user_id: Some(user),
                method: Some(AccessMethod::Nfc),
                ..Default::default()
            },
            1,
            Some(10),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].method, AccessMethod::Nfc);
    assert_eq!(page.items[0].ip_address.as_deref(), Some("192.168.1.20"));
}
