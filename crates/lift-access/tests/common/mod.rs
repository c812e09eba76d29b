//! Shared fixtures: an in-memory database with migrations applied,
//! plus helpers for users, floors and grants.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use lift_access::{
    AccessConfig, AccessGate, AccessLogService, BroadcastPublisher, PermissionService,
    StatusSweeper, VisitorAccessService,
};
use lift_core::error::{LiftError, LiftResult};
use lift_core::models::floor::{CreateFloor, Floor};
use lift_core::models::permission::PermissionUpdate;
use lift_core::models::user::{CreateUser, Role, UpdateUser, User};
use lift_core::models::visitor_access::{
    AccessStatus, CreateVisitorAccess, StatusTransitions, VisitorAccess,
};
use lift_core::repository::{
    FloorPermissionRepository, FloorRepository, UserRepository, VisitorAccessRepository,
};
use lift_db::repository::{
    SurrealAccessLogRepository, SurrealFloorPermissionRepository, SurrealFloorRepository,
    SurrealUserRepository, SurrealVisitorAccessRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

pub type Users = SurrealUserRepository<Db>;
pub type Floors = SurrealFloorRepository<Db>;
pub type Permissions = SurrealFloorPermissionRepository<Db>;
pub type Accesses = SurrealVisitorAccessRepository<Db>;
pub type Logs = SurrealAccessLogRepository<Db>;

pub type Ledger = VisitorAccessService<Users, Floors, Permissions, Accesses>;
pub type Gate = AccessGate<Users, Floors, Permissions, Accesses, Logs, BroadcastPublisher>;

pub async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    lift_db::run_migrations(&db).await.unwrap();
    db
}

pub async fn create_user(db: &Surreal<Db>, email: &str, role: Role) -> User {
    SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            email: email.into(),
            first_name: "Test".into(),
            last_name: "Person".into(),
            password_hash: "$argon2id$stub".into(),
            role,
        })
        .await
        .unwrap()
}

pub async fn deactivate_user(db: &Surreal<Db>, user_id: Uuid) {
    SurrealUserRepository::new(db.clone())
        .update(
            user_id,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

/// Create one floor per number, returned in the same order.
pub async fn create_floors(db: &Surreal<Db>, numbers: &[i32]) -> Vec<Floor> {
    let repo = SurrealFloorRepository::new(db.clone());
    let mut floors = Vec::new();
    for &floor_number in numbers {
        floors.push(
            repo.create(CreateFloor {
                floor_number,
                name: None,
            })
            .await
            .unwrap(),
        );
    }
    floors
}

pub async fn deactivate_floor(db: &Surreal<Db>, floor_id: Uuid) {
    SurrealFloorRepository::new(db.clone())
        .set_active(floor_id, false)
        .await
        .unwrap();
}

/// Allow `user_id` on each floor, bypassing the permission service.
pub async fn grant(db: &Surreal<Db>, user_id: Uuid, floors: &[&Floor]) {
    let updates = floors
        .iter()
        .map(|f| PermissionUpdate::new(f.id, true))
        .collect();
    SurrealFloorPermissionRepository::new(db.clone())
        .upsert_batch(user_id, updates, None, Utc::now())
        .await
        .unwrap();
}

pub async fn revoke(db: &Surreal<Db>, user_id: Uuid, floor: &Floor) {
    SurrealFloorPermissionRepository::new(db.clone())
        .upsert_batch(
            user_id,
            vec![PermissionUpdate::new(floor.id, false)],
            None,
            Utc::now(),
        )
        .await
        .unwrap();
}

pub fn test_config() -> AccessConfig {
    AccessConfig {
        // Small modules keep rendering fast.
        qr_module_size: 2,
        ..Default::default()
    }
}

pub fn permission_service(db: &Surreal<Db>) -> PermissionService<Users, Floors, Permissions> {
    PermissionService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealFloorRepository::new(db.clone()),
        SurrealFloorPermissionRepository::new(db.clone()),
    )
}

pub fn ledger(db: &Surreal<Db>) -> Ledger {
    VisitorAccessService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealFloorRepository::new(db.clone()),
        SurrealFloorPermissionRepository::new(db.clone()),
        SurrealVisitorAccessRepository::new(db.clone()),
        test_config(),
    )
}

pub fn sweeper(
    db: &Surreal<Db>,
    publisher: BroadcastPublisher,
) -> StatusSweeper<Accesses, BroadcastPublisher> {
    StatusSweeper::new(SurrealVisitorAccessRepository::new(db.clone()), publisher)
}

pub fn log_service(db: &Surreal<Db>) -> AccessLogService<Logs> {
    AccessLogService::new(SurrealAccessLogRepository::new(db.clone()), test_config())
}

pub fn gate(db: &Surreal<Db>, publisher: BroadcastPublisher, config: AccessConfig) -> Gate {
    AccessGate::new(
        SurrealUserRepository::new(db.clone()),
        SurrealFloorRepository::new(db.clone()),
        SurrealFloorPermissionRepository::new(db.clone()),
        SurrealVisitorAccessRepository::new(db.clone()),
        SurrealAccessLogRepository::new(db.clone()),
        publisher,
        config,
    )
}

/// Visitor access storage that can be told to misbehave: report token
/// collisions for the first few creates, or fail to count uses.
pub struct FaultyAccesses {
    inner: Accesses,
    collisions: u32,
    fail_record_use: bool,
    pub creates: AtomicU32,
}

impl FaultyAccesses {
    pub fn new(db: &Surreal<Db>) -> Self {
        Self {
            inner: SurrealVisitorAccessRepository::new(db.clone()),
            collisions: 0,
            fail_record_use: false,
            creates: AtomicU32::new(0),
        }
    }

    pub fn colliding(mut self, collisions: u32) -> Self {
        self.collisions = collisions;
        self
    }

    pub fn failing_record_use(mut self) -> Self {
        self.fail_record_use = true;
        self
    }
}

impl VisitorAccessRepository for &FaultyAccesses {
    async fn create(&self, input: CreateVisitorAccess) -> LiftResult<VisitorAccess> {
        let call = self.creates.fetch_add(1, Ordering::SeqCst);
        if call < self.collisions {
            return Err(LiftError::Conflict {
                entity: "visitor_access".into(),
            });
        }
        self.inner.create(input).await
    }

    async fn get_by_id(&self, id: Uuid) -> LiftResult<VisitorAccess> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_token(&self, qr_token: &str) -> LiftResult<VisitorAccess> {
        self.inner.get_by_token(qr_token).await
    }

    async fn list_by_creator(
        &self,
        created_by: Uuid,
        status: Option<AccessStatus>,
    ) -> LiftResult<Vec<VisitorAccess>> {
        self.inner.list_by_creator(created_by, status).await
    }

    async fn list_upcoming(
        &self,
        created_by: Uuid,
        limit: u64,
        now: DateTime<Utc>,
    ) -> LiftResult<Vec<VisitorAccess>> {
        self.inner.list_upcoming(created_by, limit, now).await
    }

    async fn transition_statuses(&self, now: DateTime<Utc>) -> LiftResult<StatusTransitions> {
        self.inner.transition_statuses(now).await
    }

    async fn record_use(&self, id: Uuid, now: DateTime<Utc>) -> LiftResult<VisitorAccess> {
        if self.fail_record_use {
            return Err(LiftError::Database("usage counter unavailable".into()));
        }
        self.inner.record_use(id, now).await
    }
}
