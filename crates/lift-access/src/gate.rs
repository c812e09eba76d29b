//! Access decisions at the lift: validate an attempt, log it, and
//! announce the entry.
//!
//! Every attempt that can be attributed to an accessor is logged,
//! granted or not. Log failures are returned to the caller; the door
//! must not open on an attempt that was not recorded.

use chrono::{DateTime, Utc};
use lift_core::context::AccessContext;
use lift_core::error::{LiftError, LiftResult};
use lift_core::models::access_log::{
    AccessLog, AccessMethod, AccessOutcome, Accessor, CreateAccessLog,
};
use lift_core::models::visitor_access::AccessStatus;
use lift_core::repository::{
    AccessLogRepository, FloorPermissionRepository, FloorRepository, UserRepository,
    VisitorAccessRepository,
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::credential;
use crate::events::{AccessEvent, EventPublisher};
use crate::logger::AccessLogService;

/// Result of one access attempt, with the log entry written for it.
#[derive(Debug, Clone, Serialize)]
pub struct AccessDecision {
    pub outcome: AccessOutcome,
    pub reason: Option<String>,
    pub log: AccessLog,
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        self.outcome == AccessOutcome::Successful
    }
}

/// Validates credential, resident and admin-override entries.
pub struct AccessGate<U, F, P, V, L, E>
where
    U: UserRepository,
    F: FloorRepository,
    P: FloorPermissionRepository,
    V: VisitorAccessRepository,
    L: AccessLogRepository,
    E: EventPublisher,
{
    user_repo: U,
    floor_repo: F,
    permission_repo: P,
    access_repo: V,
    logger: AccessLogService<L>,
    publisher: E,
    config: AccessConfig,
}

impl<U, F, P, V, L, E> AccessGate<U, F, P, V, L, E>
where
    U: UserRepository,
    F: FloorRepository,
    P: FloorPermissionRepository,
    V: VisitorAccessRepository,
    L: AccessLogRepository,
    E: EventPublisher,
{
    pub fn new(
        user_repo: U,
        floor_repo: F,
        permission_repo: P,
        access_repo: V,
        log_repo: L,
        publisher: E,
        config: AccessConfig,
    ) -> Self {
        Self {
            user_repo,
            floor_repo,
            permission_repo,
            access_repo,
            logger: AccessLogService::new(log_repo, config.clone()),
            publisher,
            config,
        }
    }

    /// Admit a visitor presenting a QR credential.
    ///
    /// `scanned` may be the bare token or the full credential URI. An
    /// unknown credential is `NotFound` and is not logged, since there
    /// is no accessor to attribute it to.
    pub async fn enter_with_credential(
        &self,
        scanned: &str,
        floor_id: Uuid,
        ip_address: Option<String>,
    ) -> LiftResult<AccessDecision> {
        let token = credential::parse_credential_payload(scanned).unwrap_or(scanned);
        let access = self.access_repo.get_by_token(token).await?;
        let floor = self.floor_repo.get_by_id(floor_id).await?;
        let now = Utc::now();

        let mut denial = if !floor.is_active {
            Some("floor is not in service")
        } else {
            match access.effective_status(now) {
                AccessStatus::Pending => Some("visitor access has not started yet"),
                AccessStatus::Expired => Some("visitor access has expired"),
                AccessStatus::Active if !access.unlocks(floor_id) => {
                    Some("visitor access does not include this floor")
                }
                AccessStatus::Active => None,
            }
        };
        if denial.is_none() && self.config.recheck_permissions_on_use {
            let host_floors = self
                .permission_repo
                .allowed_floor_ids(access.created_by)
                .await?;
            if !host_floors.contains(&floor_id) {
                denial = Some("host no longer has access to this floor");
            }
        }

        // Usage is counted before the log entry is written, so a granted
        // entry never exists for a use that was not counted.
        if denial.is_none() {
            if let Err(e) = self.access_repo.record_use(access.id, now).await {
                error!(error = %e, visitor_access_id = %access.id, "Failed to count credential use");
                denial = Some("credential use could not be recorded");
            }
        }

        self.decide(
            Accessor::Visitor(access.id),
            floor_id,
            AccessMethod::Qr,
            denial,
            None,
            ip_address,
            now,
        )
        .await
    }

    /// Admit a resident identified by NFC tag or fingerprint.
    pub async fn enter_as_resident(
        &self,
        user_id: Uuid,
        floor_id: Uuid,
        method: AccessMethod,
        ip_address: Option<String>,
    ) -> LiftResult<AccessDecision> {
        if !matches!(method, AccessMethod::Nfc | AccessMethod::Fingerprint) {
            return Err(LiftError::validation(
                "residents enter with NFC or fingerprint",
            ));
        }
        let user = self.user_repo.get_by_id(user_id).await?;
        let floor = self.floor_repo.get_by_id(floor_id).await?;

        let denial = if !user.is_active {
            Some("account is inactive")
        } else if !floor.is_active {
            Some("floor is not in service")
        } else if !self
            .permission_repo
            .allowed_floor_ids(user.id)
            .await?
            .contains(&floor_id)
        {
            Some("no permission for this floor")
        } else {
            None
        };

        self.decide(
            Accessor::User(user.id),
            floor_id,
            method,
            denial,
            None,
            ip_address,
            Utc::now(),
        )
        .await
    }

    /// Open a floor for an admin regardless of permissions. A non-admin
    /// caller gets a logged denial.
    pub async fn admin_override(
        &self,
        ctx: &AccessContext,
        floor_id: Uuid,
        reason: &str,
        ip_address: Option<String>,
    ) -> LiftResult<AccessDecision> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LiftError::validation("an override needs a reason"));
        }
        self.floor_repo.get_by_id(floor_id).await?;

        let denial = (!ctx.is_admin()).then_some("override requires an admin");
        self.decide(
            Accessor::User(ctx.user_id),
            floor_id,
            AccessMethod::AdminOverride,
            denial,
            Some(reason.to_string()),
            ip_address,
            Utc::now(),
        )
        .await
    }

    /// Announce that an occupant left a floor. Nothing is stored.
    pub fn report_exit(&self, accessor: Accessor, floor_id: Uuid) {
        self.publisher.publish(AccessEvent::OccupantExited {
            accessor,
            floor_id,
            at: Utc::now(),
        });
    }

    /// Log the attempt, then announce it if it was granted.
    #[allow(clippy::too_many_arguments)]
    async fn decide(
        &self,
        accessor: Accessor,
        floor_id: Uuid,
        method: AccessMethod,
        denial: Option<&str>,
        note: Option<String>,
        ip_address: Option<String>,
        at: DateTime<Utc>,
    ) -> LiftResult<AccessDecision> {
        let outcome = match denial {
            Some(_) => AccessOutcome::Denied,
            None => AccessOutcome::Successful,
        };
        let reason = denial.map(str::to_string).or(note);

        let log = self
            .logger
            .record(CreateAccessLog {
                accessor,
                floor_id,
                method,
                outcome,
                timestamp: Some(at),
                reason: reason.clone(),
                ip_address,
            })
            .await?;

        match outcome {
            AccessOutcome::Successful => {
                info!(?accessor, floor_id = %floor_id, ?method, "Access granted");
                self.publisher.publish(AccessEvent::OccupantEntered {
                    accessor,
                    floor_id,
                    method,
                    at,
                });
            }
            AccessOutcome::Denied => {
                warn!(?accessor, floor_id = %floor_id, ?method, reason = ?reason, "Access denied");
            }
        }

        Ok(AccessDecision {
            outcome,
            reason,
            log,
        })
    }
}
