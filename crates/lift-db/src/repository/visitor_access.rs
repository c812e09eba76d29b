//! SurrealDB implementation of [`VisitorAccessRepository`].
//!
//! A visitor access spans three tables: the `visitor_access` record,
//! one `visitor_access_floor` row per unlocked floor, and the rendered
//! credential in `credential_image`. All three are written in a single
//! transaction; the image is stored whole as base64 and only loaded on
//! single-record reads.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use lift_core::error::LiftResult;
use lift_core::models::visitor_access::{
    AccessStatus, CreateVisitorAccess, StatusTransition, StatusTransitions, VisitorAccess,
    VisitorAccessFloor,
};
use lift_core::repository::VisitorAccessRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, warn};
use uuid::Uuid;

use super::CountRow;
use crate::error::{DbError, parse_uuid};

const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Attempts per sweep statement before a write conflict is returned.
const TRANSITION_ATTEMPTS: u32 = 5;

const ACTIVATE_PENDING: &str = "\
SELECT meta::id(id) AS record_id, created_by, visitor_name FROM (
    UPDATE visitor_access SET status = 'Active'
    WHERE status = 'Pending' AND start_time <= $now AND end_time > $now
    RETURN AFTER
);";

const EXPIRE_ACTIVE: &str = "\
SELECT meta::id(id) AS record_id, created_by, visitor_name FROM (
    UPDATE visitor_access SET status = 'Expired'
    WHERE status = 'Active' AND end_time <= $now
    RETURN AFTER
);";

#[derive(Debug, SurrealValue)]
struct VisitorAccessRowWithId {
    record_id: String,
    created_by: String,
    visitor_name: String,
    qr_token: String,
    image_ref: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    first_used_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    use_count: i64,
}

#[derive(Debug, SurrealValue)]
struct FloorLinkRow {
    visitor_access_id: String,
    floor_id: String,
    floor_number: i64,
}

#[derive(Debug, SurrealValue)]
struct ImageRow {
    data: String,
}

#[derive(Debug, SurrealValue)]
struct RecordIdRow {
    record_id: String,
}

#[derive(Debug, SurrealValue)]
struct TransitionRow {
    record_id: String,
    created_by: String,
    visitor_name: String,
}

fn parse_status(s: &str) -> Result<AccessStatus, DbError> {
    match s {
        "Pending" => Ok(AccessStatus::Pending),
        "Active" => Ok(AccessStatus::Active),
        "Expired" => Ok(AccessStatus::Expired),
        other => Err(DbError::Decode(format!("unknown access status: {other}"))),
    }
}

impl VisitorAccessRowWithId {
    fn try_into_access(
        self,
        floors: Vec<VisitorAccessFloor>,
        credential_image: Option<Vec<u8>>,
    ) -> Result<VisitorAccess, DbError> {
        let use_count = u32::try_from(self.use_count)
            .map_err(|_| DbError::Decode(format!("invalid use count: {}", self.use_count)))?;
        Ok(VisitorAccess {
            id: parse_uuid(&self.record_id, "visitor access")?,
            created_by: parse_uuid(&self.created_by, "creator")?,
            visitor_name: self.visitor_name,
            qr_token: self.qr_token,
            image_ref: self.image_ref,
            credential_image,
            start_time: self.start_time,
            end_time: self.end_time,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            first_used_at: self.first_used_at,
            last_used_at: self.last_used_at,
            use_count,
            floors,
        })
    }
}

impl FloorLinkRow {
    fn try_into_floor(&self) -> Result<VisitorAccessFloor, DbError> {
        let floor_number = i32::try_from(self.floor_number)
            .map_err(|_| DbError::Decode(format!("floor number out of range: {}", self.floor_number)))?;
        Ok(VisitorAccessFloor {
            floor_id: parse_uuid(&self.floor_id, "floor")?,
            floor_number,
        })
    }
}

impl TransitionRow {
    fn try_into_transition(self, status: AccessStatus) -> Result<StatusTransition, DbError> {
        Ok(StatusTransition {
            visitor_access_id: parse_uuid(&self.record_id, "visitor access")?,
            created_by: parse_uuid(&self.created_by, "creator")?,
            visitor_name: self.visitor_name,
            status,
        })
    }
}

fn collect_transitions(
    rows: Vec<TransitionRow>,
    status: AccessStatus,
) -> Result<Vec<StatusTransition>, DbError> {
    rows.into_iter()
        .map(|row| row.try_into_transition(status))
        .collect()
}

/// SurrealDB implementation of the VisitorAccess repository.
#[derive(Clone)]
pub struct SurrealVisitorAccessRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealVisitorAccessRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Run one conditional status UPDATE, re-running it while another
    /// sweep holds the same rows. Each statement commits on its own, so
    /// a retry only repeats the statement that lost.
    async fn run_transition(
        &self,
        query: &str,
        now: DateTime<Utc>,
        status: AccessStatus,
    ) -> Result<Vec<StatusTransition>, DbError> {
        let mut attempt = 1;
        loop {
            let outcome = self
                .db
                .query(query)
                .bind(("now", now))
                .await
                .map_err(DbError::from)?
                .check()
                .map_err(|e| DbError::from_statement("visitor_access", e));

            match outcome {
                Ok(mut result) => {
                    let rows: Vec<TransitionRow> = result.take(0).map_err(DbError::from)?;
                    return collect_transitions(rows, status);
                }
                Err(DbError::WriteConflict { message, .. }) if attempt < TRANSITION_ATTEMPTS => {
                    debug!(attempt, %status, %message, "Status sweep collided, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn token_exists(&self, qr_token: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM visitor_access \
                 WHERE qr_token = $qr_token GROUP ALL",
            )
            .bind(("qr_token", qr_token.to_string()))
            .await?;

        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    /// Floor rows for the given records, grouped by record id and
    /// ordered by floor number.
    async fn floors_for(
        &self,
        ids: Vec<String>,
    ) -> Result<HashMap<String, Vec<VisitorAccessFloor>>, DbError> {
        let mut grouped: HashMap<String, Vec<VisitorAccessFloor>> = HashMap::new();
        if ids.is_empty() {
            return Ok(grouped);
        }

        let mut result = self
            .db
            .query(
                "SELECT * FROM visitor_access_floor \
                 WHERE visitor_access_id IN $ids \
                 ORDER BY floor_number ASC",
            )
            .bind(("ids", ids))
            .await?;

        let rows: Vec<FloorLinkRow> = result.take(0)?;
        for row in rows {
            let floor = row.try_into_floor()?;
            grouped.entry(row.visitor_access_id).or_default().push(floor);
        }
        Ok(grouped)
    }

    async fn load_image(&self, image_ref: &str) -> Result<Option<Vec<u8>>, DbError> {
        let mut result = self
            .db
            .query("SELECT data FROM type::record('credential_image', $image_ref)")
            .bind(("image_ref", image_ref.to_string()))
            .await?;

        let rows: Vec<ImageRow> = result.take(0)?;
        let Some(row) = rows.into_iter().next() else {
            warn!(image_ref, "credential image missing");
            return Ok(None);
        };
        let bytes = STANDARD
            .decode(row.data)
            .map_err(|e| DbError::Decode(format!("credential image: {e}")))?;
        Ok(Some(bytes))
    }

    /// Attach floors to listing rows. Images are left out of listings.
    async fn hydrate(&self, rows: Vec<VisitorAccessRowWithId>) -> Result<Vec<VisitorAccess>, DbError> {
        let ids = rows.iter().map(|r| r.record_id.clone()).collect();
        let mut floors = self.floors_for(ids).await?;
        rows.into_iter()
            .map(|row| {
                let row_floors = floors.remove(&row.record_id).unwrap_or_default();
                row.try_into_access(row_floors, None)
            })
            .collect()
    }

    async fn fetch_one(&self, id: Uuid) -> Result<VisitorAccess, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('visitor_access', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<VisitorAccessRowWithId> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "visitor_access".into(),
            id: id_str.clone(),
        })?;

        let floors = self
            .floors_for(vec![id_str.clone()])
            .await?
            .remove(&id_str)
            .unwrap_or_default();
        let image = self.load_image(&row.image_ref).await?;
        row.try_into_access(floors, image)
    }
}

impl<C: Connection> VisitorAccessRepository for SurrealVisitorAccessRepository<C> {
    async fn create(&self, input: CreateVisitorAccess) -> LiftResult<VisitorAccess> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let image_ref = Uuid::new_v4().to_string();

        let mut statements = vec![
            "BEGIN TRANSACTION;".to_string(),
            "CREATE type::record('visitor_access', $id) SET \
             created_by = $created_by, \
             visitor_name = $visitor_name, \
             qr_token = $qr_token, \
             image_ref = $image_ref, \
             start_time = $start_time, end_time = $end_time, \
             status = $status, \
             first_used_at = NONE, last_used_at = NONE, \
             use_count = 0;"
                .to_string(),
            "CREATE type::record('credential_image', $image_ref) SET \
             content_type = $content_type, data = $image_data;"
                .to_string(),
        ];
        for i in 0..input.floors.len() {
            statements.push(format!(
                "CREATE type::record('visitor_access_floor', $link_{i}) SET \
                 visitor_access_id = $id, floor_id = $floor_id_{i}, \
                 floor_number = $floor_number_{i};"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self
            .db
            .query(statements.join("\n"))
            .bind(("id", id_str.clone()))
            .bind(("created_by", input.created_by.to_string()))
            .bind(("visitor_name", input.visitor_name))
            .bind(("qr_token", input.qr_token.clone()))
            .bind(("image_ref", image_ref))
            .bind(("start_time", input.start_time))
            .bind(("end_time", input.end_time))
            .bind(("status", input.status.as_str().to_string()))
            .bind(("content_type", IMAGE_CONTENT_TYPE.to_string()))
            .bind(("image_data", STANDARD.encode(&input.credential_image)));

        for (i, floor) in input.floors.iter().enumerate() {
            builder = builder
                .bind((format!("link_{i}"), format!("{id_str}_{}", floor.floor_id)))
                .bind((format!("floor_id_{i}"), floor.floor_id.to_string()))
                .bind((format!("floor_number_{i}"), i64::from(floor.floor_number)));
        }

        let response = builder.await.map_err(DbError::from)?;
        if let Err(err) = response.check() {
            // A failed transaction may report the cancellation rather than
            // the index violation, so ask the table directly.
            if self.token_exists(&input.qr_token).await? {
                debug!("visitor access token collided");
                return Err(DbError::Conflict {
                    entity: "visitor_access".into(),
                }
                .into());
            }
            return Err(DbError::from_statement("visitor_access", err).into());
        }

        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> LiftResult<VisitorAccess> {
        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_token(&self, qr_token: &str) -> LiftResult<VisitorAccess> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id FROM visitor_access WHERE qr_token = $qr_token")
            .bind(("qr_token", qr_token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecordIdRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "visitor_access".into(),
            id: "qr_token".into(),
        })?;

        let id = parse_uuid(&row.record_id, "visitor access")?;
        Ok(self.fetch_one(id).await?)
    }

    async fn list_by_creator(
        &self,
        created_by: Uuid,
        status: Option<AccessStatus>,
    ) -> LiftResult<Vec<VisitorAccess>> {
        let status_clause = if status.is_some() {
            " AND status = $status"
        } else {
            ""
        };
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM visitor_access \
             WHERE created_by = $created_by{status_clause} \
             ORDER BY created_at DESC"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("created_by", created_by.to_string()));
        if let Some(status) = status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<VisitorAccessRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(self.hydrate(rows).await?)
    }

    async fn list_upcoming(
        &self,
        created_by: Uuid,
        limit: u64,
        now: DateTime<Utc>,
    ) -> LiftResult<Vec<VisitorAccess>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM visitor_access \
                 WHERE created_by = $created_by \
                 AND status IN ['Pending', 'Active'] \
                 AND end_time > $now \
                 ORDER BY start_time ASC \
                 LIMIT $limit",
            )
            .bind(("created_by", created_by.to_string()))
            .bind(("limit", limit))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VisitorAccessRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(self.hydrate(rows).await?)
    }

    async fn transition_statuses(&self, now: DateTime<Utc>) -> LiftResult<StatusTransitions> {
        let activated = self
            .run_transition(ACTIVATE_PENDING, now, AccessStatus::Active)
            .await?;
        let expired = self
            .run_transition(EXPIRE_ACTIVE, now, AccessStatus::Expired)
            .await?;
        Ok(StatusTransitions { activated, expired })
    }

    async fn record_use(&self, id: Uuid, now: DateTime<Utc>) -> LiftResult<VisitorAccess> {
        self.fetch_one(id).await?;

        self.db
            .query(
                "UPDATE type::record('visitor_access', $id) SET \
                 use_count += 1, \
                 first_used_at = first_used_at ?? $now, \
                 last_used_at = $now",
            )
            .bind(("id", id.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("visitor_access", e))?;

        Ok(self.fetch_one(id).await?)
    }
}
