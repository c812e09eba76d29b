//! SurrealDB implementation of [`AccessLogRepository`].
//!
//! The table only grants `create` and `select`; there is no update or
//! delete path in this repository either.

use chrono::{DateTime, Utc};
use lift_core::error::LiftResult;
use lift_core::models::access_log::{
    AccessLog, AccessMethod, AccessOutcome, Accessor, CreateAccessLog,
};
use lift_core::repository::{AccessLogFilter, AccessLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct AccessLogRowWithId {
    record_id: String,
    user_id: Option<String>,
    visitor_access_id: Option<String>,
    floor_id: String,
    method: String,
    outcome: String,
    timestamp: DateTime<Utc>,
    reason: Option<String>,
    ip_address: Option<String>,
}

fn parse_method(s: &str) -> Result<AccessMethod, DbError> {
    match s {
        "Nfc" => Ok(AccessMethod::Nfc),
        "Fingerprint" => Ok(AccessMethod::Fingerprint),
        "Qr" => Ok(AccessMethod::Qr),
        "AdminOverride" => Ok(AccessMethod::AdminOverride),
        other => Err(DbError::Decode(format!("unknown access method: {other}"))),
    }
}

fn method_to_string(method: AccessMethod) -> &'static str {
    match method {
        AccessMethod::Nfc => "Nfc",
        AccessMethod::Fingerprint => "Fingerprint",
        AccessMethod::Qr => "Qr",
        AccessMethod::AdminOverride => "AdminOverride",
    }
}

fn parse_outcome(s: &str) -> Result<AccessOutcome, DbError> {
    match s {
        "Successful" => Ok(AccessOutcome::Successful),
        "Denied" => Ok(AccessOutcome::Denied),
        other => Err(DbError::Decode(format!("unknown access outcome: {other}"))),
    }
}

fn outcome_to_string(outcome: AccessOutcome) -> &'static str {
    match outcome {
        AccessOutcome::Successful => "Successful",
        AccessOutcome::Denied => "Denied",
    }
}

impl AccessLogRowWithId {
    fn try_into_log(self) -> Result<AccessLog, DbError> {
        let accessor = match (self.user_id.as_deref(), self.visitor_access_id.as_deref()) {
            (Some(user_id), None) => Accessor::User(parse_uuid(user_id, "user")?),
            (None, Some(access_id)) => Accessor::Visitor(parse_uuid(access_id, "visitor access")?),
            _ => {
                return Err(DbError::Decode(format!(
                    "access log {} must reference exactly one accessor",
                    self.record_id
                )));
            }
        };
        Ok(AccessLog {
            id: parse_uuid(&self.record_id, "access log")?,
            accessor,
            floor_id: parse_uuid(&self.floor_id, "floor")?,
            method: parse_method(&self.method)?,
            outcome: parse_outcome(&self.outcome)?,
            timestamp: self.timestamp,
            reason: self.reason,
            ip_address: self.ip_address,
        })
    }
}

/// SurrealDB implementation of the AccessLog repository.
#[derive(Clone)]
pub struct SurrealAccessLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccessLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AccessLogRepository for SurrealAccessLogRepository<C> {
    async fn append(&self, input: CreateAccessLog) -> LiftResult<AccessLog> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let timestamp = if input.timestamp.is_some() {
            ", timestamp = $timestamp"
        } else {
            ""
        };
        let query = format!(
            "CREATE type::record('access_log', $id) SET \
             user_id = $user_id, visitor_access_id = $visitor_access_id, \
             floor_id = $floor_id, method = $method, outcome = $outcome, \
             reason = $reason, ip_address = $ip_address{timestamp}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('access_log', $id);"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.accessor.user_id().map(|id| id.to_string())))
            .bind((
                "visitor_access_id",
                input.accessor.visitor_access_id().map(|id| id.to_string()),
            ))
            .bind(("floor_id", input.floor_id.to_string()))
            .bind(("method", method_to_string(input.method).to_string()))
            .bind(("outcome", outcome_to_string(input.outcome).to_string()))
            .bind(("reason", input.reason))
            .bind(("ip_address", input.ip_address));
        if let Some(ts) = input.timestamp {
            builder = builder.bind(("timestamp", ts));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("access_log", e))?;

        let rows: Vec<AccessLogRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "access_log".into(),
            id: id_str,
        })?;

        Ok(row.try_into_log()?)
    }

    async fn list(
        &self,
        filter: AccessLogFilter,
        pagination: Pagination,
    ) -> LiftResult<PaginatedResult<AccessLog>> {
        let mut conditions = Vec::new();
        if filter.user_id.is_some() {
            conditions.push("user_id = $user_id");
        }
        if filter.visitor_access_id.is_some() {
            conditions.push("visitor_access_id = $visitor_access_id");
        }
        if filter.floor_id.is_some() {
            conditions.push("floor_id = $floor_id");
        }
        if filter.method.is_some() {
            conditions.push("method = $method");
        }
        if filter.outcome.is_some() {
            conditions.push("outcome = $outcome");
        }
        if filter.from.is_some() {
            conditions.push("timestamp >= $from");
        }
        if filter.to.is_some() {
            conditions.push("timestamp <= $to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT count() AS total FROM access_log{where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM access_log{where_clause} \
             ORDER BY timestamp DESC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(user_id) = filter.user_id {
            builder = builder.bind(("user_id", user_id.to_string()));
        }
        if let Some(access_id) = filter.visitor_access_id {
            builder = builder.bind(("visitor_access_id", access_id.to_string()));
        }
        if let Some(floor_id) = filter.floor_id {
            builder = builder.bind(("floor_id", floor_id.to_string()));
        }
        if let Some(method) = filter.method {
            builder = builder.bind(("method", method_to_string(method).to_string()));
        }
        if let Some(outcome) = filter.outcome {
            builder = builder.bind(("outcome", outcome_to_string(outcome).to_string()));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<AccessLogRowWithId> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(AccessLogRowWithId::try_into_log)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
