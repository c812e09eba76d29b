//! Caller identity passed explicitly into every service call.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

/// Who is performing an operation. Supplied by the identity/session
/// layer and trusted as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AccessContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn resident(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Resident)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this caller is acting on someone else's behalf.
    pub fn acts_for_other(&self, target_user_id: Uuid) -> bool {
        self.user_id != target_user_id
    }
}
