//! Floor permission domain model.
//!
//! One row per `(user, floor)` pair. Rows are upserted, never deleted;
//! a revoked grant is a row with `is_allowed = false`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::floor::Floor;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FloorPermission {
    pub user_id: Uuid,
    pub floor_id: Uuid,
    pub is_allowed: bool,
    /// Admin who last set this row; `None` for self-service changes.
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// One entry of a permission batch update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionUpdate {
    pub floor_id: Uuid,
    pub is_allowed: bool,
    /// `None` leaves existing notes untouched.
    pub notes: Option<String>,
}

impl PermissionUpdate {
    pub fn new(floor_id: Uuid, is_allowed: bool) -> Self {
        Self {
            floor_id,
            is_allowed,
            notes: None,
        }
    }
}

/// A floor joined against one user's permission row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorPermissionView {
    pub floor: Floor,
    pub is_allowed: bool,
    /// Whether the caller who requested the view may change this row.
    pub can_modify: bool,
}
