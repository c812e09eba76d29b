//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Multi-row writes
//! (`FloorPermissionRepository::upsert_batch`,
//! `VisitorAccessRepository::create`) are atomic: either every row
//! commits or none does.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LiftResult;
use crate::models::{
    access_log::{AccessLog, AccessMethod, AccessOutcome, CreateAccessLog},
    floor::{CreateFloor, Floor},
    permission::{FloorPermission, PermissionUpdate},
    user::{CreateUser, UpdateUser, User},
    visitor_access::{AccessStatus, CreateVisitorAccess, StatusTransitions, VisitorAccess},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// Largest offset storage accepts; SurrealDB numbers are signed.
const MAX_OFFSET: u64 = i64::MAX as u64;

impl Pagination {
    /// Build from a 1-indexed page number. Page 0 is treated as page 1;
    /// pages past the addressable range land on an empty page.
    pub fn from_page(page: u64, page_size: u64) -> Self {
        let page = page.max(1);
        Self {
            offset: (page - 1).saturating_mul(page_size).min(MAX_OFFSET),
            limit: page_size,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    /// 1-indexed page this result represents.
    pub fn page(&self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }
}

// ---------------------------------------------------------------------------
// Users & floors
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = LiftResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LiftResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = LiftResult<User>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser) -> impl Future<Output = LiftResult<User>> + Send;
    /// Active users ordered by last name, then first name.
    fn list_active(&self) -> impl Future<Output = LiftResult<Vec<User>>> + Send;
}

pub trait FloorRepository: Send + Sync {
    fn create(&self, input: CreateFloor) -> impl Future<Output = LiftResult<Floor>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LiftResult<Floor>> + Send;
    fn get_by_number(&self, floor_number: i32) -> impl Future<Output = LiftResult<Floor>> + Send;
    /// Fetch the floors that exist among `ids`; missing ids are skipped.
    fn get_many(&self, ids: &[Uuid]) -> impl Future<Output = LiftResult<Vec<Floor>>> + Send;
    fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> impl Future<Output = LiftResult<Floor>> + Send;
    /// Active floors ordered by floor number ascending.
    fn list_active(&self) -> impl Future<Output = LiftResult<Vec<Floor>>> + Send;
}

// ---------------------------------------------------------------------------
// Floor permissions
// ---------------------------------------------------------------------------

pub trait FloorPermissionRepository: Send + Sync {
    /// Every permission row held by a user, allowed or not.
    fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LiftResult<Vec<FloorPermission>>> + Send;

    /// Floors where the user currently has `is_allowed = true`.
    fn allowed_floor_ids(&self, user_id: Uuid)
    -> impl Future<Output = LiftResult<Vec<Uuid>>> + Send;

    /// Upsert one row per update in a single transaction. Every row
    /// gets the same `granted_by` and `granted_at`.
    fn upsert_batch(
        &self,
        user_id: Uuid,
        updates: Vec<PermissionUpdate>,
        granted_by: Option<Uuid>,
        granted_at: DateTime<Utc>,
    ) -> impl Future<Output = LiftResult<Vec<FloorPermission>>> + Send;
}

// ---------------------------------------------------------------------------
// Visitor access
// ---------------------------------------------------------------------------

pub trait VisitorAccessRepository: Send + Sync {
    /// Persist the access, its floor rows and its credential image
    /// atomically. A duplicate token yields `LiftError::Conflict`.
    fn create(
        &self,
        input: CreateVisitorAccess,
    ) -> impl Future<Output = LiftResult<VisitorAccess>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LiftResult<VisitorAccess>> + Send;
    fn get_by_token(&self, qr_token: &str)
    -> impl Future<Output = LiftResult<VisitorAccess>> + Send;
    /// Records created by a user, newest first.
    fn list_by_creator(
        &self,
        created_by: Uuid,
        status: Option<AccessStatus>,
    ) -> impl Future<Output = LiftResult<Vec<VisitorAccess>>> + Send;
    /// Pending and Active records created by a user whose window is
    /// still open at `now`, soonest start first.
    fn list_upcoming(
        &self,
        created_by: Uuid,
        limit: u64,
        now: DateTime<Utc>,
    ) -> impl Future<Output = LiftResult<Vec<VisitorAccess>>> + Send;
    /// Set-based Pending→Active and Active→Expired transitions at `now`.
    fn transition_statuses(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = LiftResult<StatusTransitions>> + Send;
    /// Count one successful use at `now`.
    fn record_use(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = LiftResult<VisitorAccess>> + Send;
}

// ---------------------------------------------------------------------------
// Access log (append-only)
// ---------------------------------------------------------------------------

/// Query filters for access log entries. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct AccessLogFilter {
    pub user_id: Option<Uuid>,
    pub visitor_access_id: Option<Uuid>,
    pub floor_id: Option<Uuid>,
    pub method: Option<AccessMethod>,
    pub outcome: Option<AccessOutcome>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AccessLogRepository: Send + Sync {
    /// Append a new entry. No update or delete operations exist.
    fn append(&self, input: CreateAccessLog) -> impl Future<Output = LiftResult<AccessLog>> + Send;
    /// Matching entries, newest first.
    fn list(
        &self,
        filter: AccessLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = LiftResult<PaginatedResult<AccessLog>>> + Send;
}
