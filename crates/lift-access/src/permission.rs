//! Per-user floor permission matrix.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use lift_core::context::AccessContext;
use lift_core::error::{LiftError, LiftResult};
use lift_core::models::floor::Floor;
use lift_core::models::permission::{FloorPermission, FloorPermissionView, PermissionUpdate};
use lift_core::repository::{FloorPermissionRepository, FloorRepository, UserRepository};
use tracing::{info, warn};
use uuid::Uuid;

/// Reads and updates floor permissions.
///
/// Admins may change anyone's rows. Residents may only give up floors
/// they currently hold; granting is an admin action.
pub struct PermissionService<U, F, P>
where
    U: UserRepository,
    F: FloorRepository,
    P: FloorPermissionRepository,
{
    user_repo: U,
    floor_repo: F,
    permission_repo: P,
}

impl<U, F, P> PermissionService<U, F, P>
where
    U: UserRepository,
    F: FloorRepository,
    P: FloorPermissionRepository,
{
    pub fn new(user_repo: U, floor_repo: F, permission_repo: P) -> Self {
        Self {
            user_repo,
            floor_repo,
            permission_repo,
        }
    }

    /// Every active floor joined against the user's permission rows,
    /// ascending by floor number. A floor without a row is not allowed.
    pub async fn get_floor_permissions(
        &self,
        ctx: &AccessContext,
        user_id: Uuid,
    ) -> LiftResult<Vec<FloorPermissionView>> {
        if !ctx.is_admin() && ctx.acts_for_other(user_id) {
            return Err(LiftError::AuthorizationDenied {
                reason: "cannot view another user's floor permissions".into(),
            });
        }
        self.user_repo.get_by_id(user_id).await?;

        let rows: HashMap<Uuid, bool> = self
            .permission_repo
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|p| (p.floor_id, p.is_allowed))
            .collect();

        let mut floors = self.floor_repo.list_active().await?;
        floors.sort_by_key(|f| f.floor_number);

        Ok(floors
            .into_iter()
            .map(|floor| {
                let is_allowed = rows.get(&floor.id).copied().unwrap_or(false);
                let can_modify = can_modify(ctx, user_id, is_allowed);
                FloorPermissionView {
                    floor,
                    is_allowed,
                    can_modify,
                }
            })
            .collect())
    }

    /// Apply a batch of permission changes for `user_id` atomically.
    ///
    /// `granted_by` is recorded only when an admin changes someone
    /// else's permissions. Every row in the batch gets a fresh
    /// `granted_at`, changed or not.
    pub async fn update_permissions(
        &self,
        ctx: &AccessContext,
        user_id: Uuid,
        updates: Vec<PermissionUpdate>,
    ) -> LiftResult<Vec<FloorPermission>> {
        if updates.is_empty() {
            return Err(LiftError::validation("no permission changes supplied"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = updates.iter().find(|u| !seen.insert(u.floor_id)) {
            return Err(LiftError::validation(format!(
                "floor {} appears more than once",
                dup.floor_id
            )));
        }

        let target = self.user_repo.get_by_id(user_id).await?;
        if !target.is_active {
            return Err(LiftError::not_found("user", user_id));
        }

        if !ctx.is_admin() {
            if ctx.acts_for_other(user_id) {
                return Err(LiftError::AuthorizationDenied {
                    reason: "only an admin can change another user's floor permissions".into(),
                });
            }
            if updates.iter().any(|u| u.is_allowed) {
                return Err(LiftError::AuthorizationDenied {
                    reason: "only an admin can grant floor access".into(),
                });
            }
        }

        let floor_ids: Vec<Uuid> = updates.iter().map(|u| u.floor_id).collect();
        let found: HashSet<Uuid> = self
            .floor_repo
            .get_many(&floor_ids)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();
        if let Some(missing) = floor_ids.iter().find(|id| !found.contains(id)) {
            return Err(LiftError::not_found("floor", missing));
        }

        let granted_by = (ctx.is_admin() && ctx.acts_for_other(user_id)).then_some(ctx.user_id);
        let rows = self
            .permission_repo
            .upsert_batch(user_id, updates, granted_by, Utc::now())
            .await
            .inspect_err(|e| warn!(user_id = %user_id, error = %e, "Permission update failed"))?;

        info!(
            user_id = %user_id,
            actor = %ctx.user_id,
            rows = rows.len(),
            "Floor permissions updated"
        );
        Ok(rows)
    }

    /// Active floors the user may currently grant visitors access to,
    /// ascending by floor number.
    pub async fn allowed_floors(&self, user_id: Uuid) -> LiftResult<Vec<Floor>> {
        let ids = self.permission_repo.allowed_floor_ids(user_id).await?;
        let mut floors: Vec<Floor> = self
            .floor_repo
            .get_many(&ids)
            .await?
            .into_iter()
            .filter(|f| f.is_active)
            .collect();
        floors.sort_by_key(|f| f.floor_number);
        Ok(floors)
    }
}

/// Whether `ctx` may change `user_id`'s row for a floor currently at
/// `is_allowed`.
fn can_modify(ctx: &AccessContext, user_id: Uuid, is_allowed: bool) -> bool {
    ctx.is_admin() || (!ctx.acts_for_other(user_id) && is_allowed)
}
