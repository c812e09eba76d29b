//! SurrealDB implementation of [`FloorRepository`].

use chrono::{DateTime, Utc};
use lift_core::error::LiftResult;
use lift_core::models::floor::{CreateFloor, Floor};
use lift_core::repository::FloorRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct FloorRowWithId {
    record_id: String,
    floor_number: i64,
    name: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl FloorRowWithId {
    fn try_into_floor(self) -> Result<Floor, DbError> {
        let floor_number = i32::try_from(self.floor_number)
            .map_err(|_| DbError::Decode(format!("floor number out of range: {}", self.floor_number)))?;
        Ok(Floor {
            id: parse_uuid(&self.record_id, "floor")?,
            floor_number,
            name: self.name,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

fn collect_floors(rows: Vec<FloorRowWithId>) -> Result<Vec<Floor>, DbError> {
    rows.into_iter().map(FloorRowWithId::try_into_floor).collect()
}

/// SurrealDB implementation of the Floor repository.
#[derive(Clone)]
pub struct SurrealFloorRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFloorRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> FloorRepository for SurrealFloorRepository<C> {
    async fn create(&self, input: CreateFloor) -> LiftResult<Floor> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('floor', $id) SET \
                 floor_number = $floor_number, \
                 name = $name, \
                 is_active = true",
            )
            .bind(("id", id.to_string()))
            .bind(("floor_number", i64::from(input.floor_number)))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("floor", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> LiftResult<Floor> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('floor', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FloorRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "floor".into(),
            id: id_str,
        })?;

        Ok(row.try_into_floor()?)
    }

    async fn get_by_number(&self, floor_number: i32) -> LiftResult<Floor> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM floor \
                 WHERE floor_number = $floor_number",
            )
            .bind(("floor_number", i64::from(floor_number)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FloorRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "floor".into(),
            id: format!("number={floor_number}"),
        })?;

        Ok(row.try_into_floor()?)
    }

    async fn get_many(&self, ids: &[Uuid]) -> LiftResult<Vec<Floor>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strs: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM floor \
                 WHERE meta::id(id) IN $ids \
                 ORDER BY floor_number ASC",
            )
            .bind(("ids", id_strs))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FloorRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect_floors(rows)?)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> LiftResult<Floor> {
        // Fails with NotFound before the UPDATE, which would not.
        self.get_by_id(id).await?;

        self.db
            .query("UPDATE type::record('floor', $id) SET is_active = $is_active")
            .bind(("id", id.to_string()))
            .bind(("is_active", is_active))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("floor", e))?;

        self.get_by_id(id).await
    }

    async fn list_active(&self) -> LiftResult<Vec<Floor>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM floor \
                 WHERE is_active = true ORDER BY floor_number ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FloorRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect_floors(rows)?)
    }
}
