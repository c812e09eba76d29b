//! SurrealDB implementation of [`FloorPermissionRepository`].
//!
//! Rows are keyed by `{user_id}_{floor_id}` so a batch is a series of
//! `UPSERT`s on known record ids inside one transaction.

use chrono::{DateTime, Utc};
use lift_core::error::LiftResult;
use lift_core::models::permission::{FloorPermission, PermissionUpdate};
use lift_core::repository::FloorPermissionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct FloorPermissionRow {
    user_id: String,
    floor_id: String,
    is_allowed: bool,
    granted_by: Option<String>,
    granted_at: DateTime<Utc>,
    notes: Option<String>,
}

impl FloorPermissionRow {
    fn try_into_permission(self) -> Result<FloorPermission, DbError> {
        let granted_by = self
            .granted_by
            .as_deref()
            .map(|id| parse_uuid(id, "grantor"))
            .transpose()?;
        Ok(FloorPermission {
            user_id: parse_uuid(&self.user_id, "user")?,
            floor_id: parse_uuid(&self.floor_id, "floor")?,
            is_allowed: self.is_allowed,
            granted_by,
            granted_at: self.granted_at,
            notes: self.notes,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct FloorIdRow {
    floor_id: String,
}

fn permission_key(user_id: Uuid, floor_id: Uuid) -> String {
    format!("{user_id}_{floor_id}")
}

/// SurrealDB implementation of the FloorPermission repository.
#[derive(Clone)]
pub struct SurrealFloorPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFloorPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> FloorPermissionRepository for SurrealFloorPermissionRepository<C> {
    async fn list_for_user(&self, user_id: Uuid) -> LiftResult<Vec<FloorPermission>> {
        let mut result = self
            .db
            .query("SELECT * FROM floor_permission WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FloorPermissionRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(FloorPermissionRow::try_into_permission)
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn allowed_floor_ids(&self, user_id: Uuid) -> LiftResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT floor_id FROM floor_permission \
                 WHERE user_id = $user_id AND is_allowed = true",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FloorIdRow> = result.take(0).map_err(DbError::from)?;
        rows.iter()
            .map(|row| parse_uuid(&row.floor_id, "floor"))
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn upsert_batch(
        &self,
        user_id: Uuid,
        updates: Vec<PermissionUpdate>,
        granted_by: Option<Uuid>,
        granted_at: DateTime<Utc>,
    ) -> LiftResult<Vec<FloorPermission>> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        for (i, update) in updates.iter().enumerate() {
            let notes = if update.notes.is_some() {
                format!(", notes = $notes_{i}")
            } else {
                String::new()
            };
            statements.push(format!(
                "UPSERT type::record('floor_permission', $key_{i}) SET \
                 user_id = $user_id, floor_id = $floor_id_{i}, \
                 is_allowed = $is_allowed_{i}, \
                 granted_by = $granted_by, granted_at = $granted_at{notes};"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self
            .db
            .query(statements.join("\n"))
            .bind(("user_id", user_id.to_string()))
            .bind(("granted_by", granted_by.map(|id| id.to_string())))
            .bind(("granted_at", granted_at));

        for (i, update) in updates.iter().enumerate() {
            builder = builder
                .bind((format!("key_{i}"), permission_key(user_id, update.floor_id)))
                .bind((format!("floor_id_{i}"), update.floor_id.to_string()))
                .bind((format!("is_allowed_{i}"), update.is_allowed));
            if let Some(notes) = &update.notes {
                builder = builder.bind((format!("notes_{i}"), notes.clone()));
            }
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("floor_permission", e))?;

        let floor_ids: Vec<String> = updates.iter().map(|u| u.floor_id.to_string()).collect();
        let mut result = self
            .db
            .query(
                "SELECT * FROM floor_permission \
                 WHERE user_id = $user_id AND floor_id IN $floor_ids",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("floor_ids", floor_ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FloorPermissionRow> = result.take(0).map_err(DbError::from)?;
        let mut stored = rows
            .into_iter()
            .map(FloorPermissionRow::try_into_permission)
            .collect::<Result<Vec<_>, DbError>>()?;

        // Hand rows back in the order the caller submitted them.
        stored.sort_by_key(|row| {
            updates
                .iter()
                .position(|u| u.floor_id == row.floor_id)
                .unwrap_or(usize::MAX)
        });
        Ok(stored)
    }
}
