//! Integration tests for the VisitorAccess repository.

use chrono::{DateTime, Duration, Utc};
use lift_core::error::LiftError;
use lift_core::models::floor::CreateFloor;
use lift_core::models::visitor_access::{AccessStatus, CreateVisitorAccess, VisitorAccessFloor};
use lift_core::repository::{FloorRepository, VisitorAccessRepository};
use lift_db::repository::{SurrealFloorRepository, SurrealVisitorAccessRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

async fn setup() -> (Surreal<Db>, Vec<VisitorAccessFloor>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    lift_db::run_migrations(&db).await.unwrap();

    let floor_repo = SurrealFloorRepository::new(db.clone());
    let mut floors = Vec::new();
    for floor_number in [5, 3] {
        let floor = floor_repo
            .create(CreateFloor {
                floor_number,
                name: None,
            })
            .await
            .unwrap();
        floors.push(VisitorAccessFloor {
            floor_id: floor.id,
            floor_number,
        });
    }
    (db, floors)
}

async fn count(db: &Surreal<Db>, table: &str) -> u64 {
    let mut result = db
        .query(format!("SELECT count() AS total FROM {table} GROUP ALL"))
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    rows.first().map(|r| r.total).unwrap_or(0)
}

fn new_access(
    created_by: Uuid,
    token: &str,
    floors: &[VisitorAccessFloor],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    status: AccessStatus,
) -> CreateVisitorAccess {
    CreateVisitorAccess {
        created_by,
        visitor_name: "Val Visitor".into(),
        qr_token: token.into(),
        // Non-trivial payload so a truncated copy would be noticed.
        credential_image: (0..4096u32).map(|i| (i % 251) as u8).collect(),
        start_time: start,
        end_time: end,
        status,
        floors: floors.to_vec(),
    }
}

#[tokio::test]
async fn create_and_reload_with_full_image() {
    let (db, floors) = setup().await;
    let repo = SurrealVisitorAccessRepository::new(db);
    let creator = Uuid::new_v4();
    let now = Utc::now();

    let input = new_access(
        creator,
        "token-a",
        &floors,
        now - Duration::hours(1),
        now + Duration::hours(1),
        AccessStatus::Active,
    );
    let image = input.credential_image.clone();
    let created = repo.create(input).await.unwrap();

    assert_eq!(created.created_by, creator);
    assert_eq!(created.status, AccessStatus::Active);
    assert_eq!(created.use_count, 0);
    assert_eq!(created.credential_image.as_deref(), Some(image.as_slice()));
    let numbers: Vec<i32> = created.floors.iter().map(|f| f.floor_number).collect();
    assert_eq!(numbers, vec![3, 5], "floors ordered by number");

    let reloaded = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(reloaded.credential_image.as_deref(), Some(image.as_slice()));
    assert_eq!(reloaded.image_ref, created.image_ref);

    let by_token = repo.get_by_token("token-a").await.unwrap();
    assert_eq!(by_token.id, created.id);
}

#[tokio::test]
async fn duplicate_token_conflicts_and_rolls_back() {
    let (db, floors) = setup().await;
    let repo = SurrealVisitorAccessRepository::new(db.clone());
    let now = Utc::now();
    let window = (now, now + Duration::hours(2));

    repo.create(new_access(
        Uuid::new_v4(),
        "same-token",
        &floors[..1],
        window.0,
        window.1,
        AccessStatus::Active,
    ))
    .await
    .unwrap();

    let err = repo
        .create(new_access(
            Uuid::new_v4(),
            "same-token",
            &floors,
            window.0,
            window.1,
            AccessStatus::Active,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LiftError::Conflict { .. }), "got {err:?}");

    assert_eq!(count(&db, "visitor_access").await, 1);
    assert_eq!(count(&db, "visitor_access_floor").await, 1);
    assert_eq!(count(&db, "credential_image").await, 1);
}

#[tokio::test]
async fn unknown_ids_and_tokens_are_not_found() {
    let (db, _floors) = setup().await;
    let repo = SurrealVisitorAccessRepository::new(db);

    assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap_err().is_not_found());
    assert!(repo.get_by_token("nope").await.unwrap_err().is_not_found());
    assert!(
        repo.record_use(Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn list_by_creator_newest_first_with_status_filter() {
    let (db, floors) = setup().await;
    let repo = SurrealVisitorAccessRepository::new(db);
    let creator = Uuid::new_v4();
    let now = Utc::now();

    let active = repo
        .create(new_access(
            creator,
            "t1",
            &floors,
            now - Duration::hours(1),
            now + Duration::hours(1),
            AccessStatus::Active,
        ))
        .await
        .unwrap();
    let pending = repo
        .create(new_access(
            creator,
            "t2",
            &floors,
            now + Duration::hours(1),
            now + Duration::hours(2),
            AccessStatus::Pending,
        ))
        .await
        .unwrap();
    repo.create(new_access(
        Uuid::new_v4(),
        "t3",
        &floors,
        now,
        now + Duration::hours(1),
        AccessStatus::Active,
    ))
    .await
    .unwrap();

    let all = repo.list_by_creator(creator, None).await.unwrap();
    let ids: Vec<Uuid> = all.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![pending.id, active.id]);
    assert!(all.iter().all(|a| a.credential_image.is_none()));
    assert!(all.iter().all(|a| a.floors.len() == 2));

    let only_pending = repo
        .list_by_creator(creator, Some(AccessStatus::Pending))
        .await
        .unwrap();
    assert_eq!(only_pending.len(), 1);
    assert_eq!(only_pending[0].id, pending.id);

    let upcoming = repo.list_upcoming(creator, 1, now).await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, active.id, "soonest start first");
}

#[tokio::test]
async fn upcoming_skips_closed_windows_left_pending() {
    let (db, floors) = setup().await;
    let repo = SurrealVisitorAccessRepository::new(db);
    let creator = Uuid::new_v4();
    let now = Utc::now();

    // Never swept: still Pending although its window closed an hour ago.
    repo.create(new_access(
        creator,
        "stale",
        &floors,
        now - Duration::hours(3),
        now - Duration::hours(1),
        AccessStatus::Pending,
    ))
    .await
    .unwrap();
    let tomorrow = repo
        .create(new_access(
            creator,
            "tomorrow",
            &floors,
            now + Duration::hours(24),
            now + Duration::hours(26),
            AccessStatus::Pending,
        ))
        .await
        .unwrap();

    let upcoming = repo.list_upcoming(creator, 10, now).await.unwrap();
    let ids: Vec<Uuid> = upcoming.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![tomorrow.id]);
}

#[tokio::test]
async fn transitions_move_each_record_once() {
    let (db, floors) = setup().await;
    let repo = SurrealVisitorAccessRepository::new(db);
    let creator = Uuid::new_v4();
    let now = Utc::now();

    let pending = repo
        .create(new_access(
            creator,
            "p",
            &floors,
            now + Duration::hours(1),
            now + Duration::hours(2),
            AccessStatus::Pending,
        ))
        .await
        .unwrap();

    let at = now + Duration::minutes(90);
    let moved = repo.transition_statuses(at).await.unwrap();
    assert_eq!(moved.activated.len(), 1);
    assert_eq!(moved.activated[0].visitor_access_id, pending.id);
    assert_eq!(moved.activated[0].created_by, creator);
    assert_eq!(moved.activated[0].status, AccessStatus::Active);
    assert!(moved.expired.is_empty());

    let again = repo.transition_statuses(at).await.unwrap();
    assert!(again.activated.is_empty() && again.expired.is_empty());

    let later = repo
        .transition_statuses(now + Duration::hours(3))
        .await
        .unwrap();
    assert_eq!(later.expired.len(), 1);
    assert_eq!(
        repo.get_by_id(pending.id).await.unwrap().status,
        AccessStatus::Expired
    );
}

#[tokio::test]
async fn record_use_stamps_first_use_once() {
    let (db, floors) = setup().await;
    let repo = SurrealVisitorAccessRepository::new(db);
    let now = Utc::now();

    let access = repo
        .create(new_access(
            Uuid::new_v4(),
            "use-me",
            &floors,
            now - Duration::hours(1),
            now + Duration::hours(1),
            AccessStatus::Active,
        ))
        .await
        .unwrap();

    let first = now;
    let second = now + Duration::minutes(10);
    repo.record_use(access.id, first).await.unwrap();
    let used = repo.record_use(access.id, second).await.unwrap();

    assert_eq!(used.use_count, 2);
    assert_eq!(used.first_used_at, Some(first));
    assert_eq!(used.last_used_at, Some(second));
}
