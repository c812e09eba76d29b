//! Visitor access ledger: issuing and reading time-boxed visitor
//! credentials.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use lift_core::context::AccessContext;
use lift_core::error::{LiftError, LiftResult};
use lift_core::models::visitor_access::{
    AccessStatus, CreateVisitorAccess, StatusFilter, VisitorAccess, VisitorAccessFloor,
};
use lift_core::repository::{
    FloorPermissionRepository, FloorRepository, UserRepository, VisitorAccessRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::credential;

/// Input for issuing a visitor credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVisitorAccessRequest {
    pub visitor_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub floor_ids: Vec<Uuid>,
}

/// Issues and reads visitor access records.
pub struct VisitorAccessService<U, F, P, V>
where
    U: UserRepository,
    F: FloorRepository,
    P: FloorPermissionRepository,
    V: VisitorAccessRepository,
{
    user_repo: U,
    floor_repo: F,
    permission_repo: P,
    access_repo: V,
    config: AccessConfig,
}

impl<U, F, P, V> VisitorAccessService<U, F, P, V>
where
    U: UserRepository,
    F: FloorRepository,
    P: FloorPermissionRepository,
    V: VisitorAccessRepository,
{
    pub fn new(
        user_repo: U,
        floor_repo: F,
        permission_repo: P,
        access_repo: V,
        config: AccessConfig,
    ) -> Self {
        Self {
            user_repo,
            floor_repo,
            permission_repo,
            access_repo,
            config,
        }
    }

    /// Issue a visitor credential for `ctx.user_id`.
    ///
    /// Checks run in order: input validation, creator is an active
    /// user, every floor is one the creator is allowed on, every floor
    /// exists and is active. Nothing is written unless all pass, and
    /// the record, its floor rows and its image are stored together.
    pub async fn create_access(
        &self,
        ctx: &AccessContext,
        request: CreateVisitorAccessRequest,
    ) -> LiftResult<VisitorAccess> {
        let visitor_name = request.visitor_name.trim().to_string();
        if visitor_name.is_empty() {
            return Err(LiftError::validation("visitor name is required"));
        }
        if request.floor_ids.is_empty() {
            return Err(LiftError::validation("at least one floor is required"));
        }
        if request.end_time <= request.start_time {
            return Err(LiftError::validation("end time must be after start time"));
        }

        let mut seen = HashSet::new();
        let floor_ids: Vec<Uuid> = request
            .floor_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        let creator = self.user_repo.get_by_id(ctx.user_id).await?;
        if !creator.is_active {
            return Err(LiftError::not_found("user", ctx.user_id));
        }

        let allowed: HashSet<Uuid> = self
            .permission_repo
            .allowed_floor_ids(creator.id)
            .await?
            .into_iter()
            .collect();
        let denied: Vec<Uuid> = floor_ids
            .iter()
            .copied()
            .filter(|id| !allowed.contains(id))
            .collect();
        if !denied.is_empty() {
            info!(
                user_id = %creator.id,
                denied = denied.len(),
                "Visitor access refused for floors outside the creator's permissions"
            );
            return Err(LiftError::FloorAccessDenied { floor_ids: denied });
        }

        let floors = self.floor_repo.get_many(&floor_ids).await?;
        let mut access_floors = Vec::with_capacity(floor_ids.len());
        for id in &floor_ids {
            match floors.iter().find(|f| f.id == *id) {
                Some(floor) if floor.is_active => access_floors.push(VisitorAccessFloor {
                    floor_id: floor.id,
                    floor_number: floor.floor_number,
                }),
                _ => return Err(LiftError::not_found("floor", id)),
            }
        }

        let status = AccessStatus::initial(Utc::now(), request.start_time);
        let attempts = self.config.token_retry_limit.max(1);
        for attempt in 1..=attempts {
            let token = credential::generate_token();
            let image = credential::generate_image(
                &credential::credential_payload(&token),
                self.config.qr_module_size,
            )?;

            let input = CreateVisitorAccess {
                created_by: creator.id,
                visitor_name: visitor_name.clone(),
                qr_token: token,
                credential_image: image,
                start_time: request.start_time,
                end_time: request.end_time,
                status,
                floors: access_floors.clone(),
            };

            match self.access_repo.create(input).await {
                Ok(access) => {
                    info!(
                        visitor_access_id = %access.id,
                        created_by = %creator.id,
                        status = %access.status,
                        floors = access.floors.len(),
                        "Visitor access issued"
                    );
                    return Ok(access);
                }
                Err(LiftError::Conflict { .. }) => {
                    debug!(attempt, "Visitor token collided, minting another");
                }
                Err(e) => {
                    error!(error = %e, created_by = %creator.id, "Failed to store visitor access");
                    return Err(e);
                }
            }
        }

        error!(attempts, "Exhausted visitor token retries");
        Err(LiftError::Internal(
            "could not mint a unique visitor token".into(),
        ))
    }

    /// A user's visitor records, newest first.
    pub async fn list_accesses(
        &self,
        user_id: Uuid,
        filter: Option<StatusFilter>,
    ) -> LiftResult<Vec<VisitorAccess>> {
        let status = filter.and_then(|f| f.status());
        self.access_repo.list_by_creator(user_id, status).await
    }

    /// A single record with its floors and full credential image.
    pub async fn get_by_id(&self, id: Uuid) -> LiftResult<Option<VisitorAccess>> {
        match self.access_repo.get_by_id(id).await {
            Ok(access) => Ok(Some(access)),
            Err(LiftError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Look a record up by the token a scanned credential carries.
    pub async fn get_by_token(&self, token: &str) -> LiftResult<Option<VisitorAccess>> {
        match self.access_repo.get_by_token(token).await {
            Ok(access) => Ok(Some(access)),
            Err(LiftError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Pending and active visitors for a user's dashboard, soonest
    /// start first. Records whose window has closed are left out even
    /// if no sweep has expired them yet.
    pub async fn upcoming(&self, user_id: Uuid, limit: u64) -> LiftResult<Vec<VisitorAccess>> {
        self.access_repo.list_upcoming(user_id, limit, Utc::now()).await
    }
}
