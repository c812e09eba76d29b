//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashes arrive pre-computed; this layer never sees a
//! plaintext password.

use chrono::{DateTime, Utc};
use lift_core::error::LiftResult;
use lift_core::models::user::{CreateUser, Role, UpdateUser, User};
use lift_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    role: String,
    is_active: bool,
    email_confirmed: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    match s {
        "Resident" => Ok(Role::Resident),
        "Admin" => Ok(Role::Admin),
        other => Err(DbError::Decode(format!("unknown role: {other}"))),
    }
}

fn role_to_string(role: Role) -> &'static str {
    match role {
        Role::Resident => "Resident",
        Role::Admin => "Admin",
    }
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            is_active: self.is_active,
            email_confirmed: self.email_confirmed,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
        })
    }
}

const USER_PROJECTION: &str = "meta::id(id) AS record_id, email, first_name, last_name, \
     password_hash, role, is_active, email_confirmed, created_at, last_login_at";

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, id: Uuid) -> Result<User, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!(
                "SELECT {USER_PROJECTION} FROM type::record('user', $id)"
            ))
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<UserRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or(DbError::NotFound {
                entity: "user".into(),
                id: id_str,
            })?
            .try_into_user()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> LiftResult<User> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, \
                 first_name = $first_name, last_name = $last_name, \
                 password_hash = $password_hash, \
                 role = $role, \
                 is_active = true, \
                 email_confirmed = false, \
                 last_login_at = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("email", input.email))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("password_hash", input.password_hash))
            .bind(("role", role_to_string(input.role).to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("user", e))?;

        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> LiftResult<User> {
        Ok(self.fetch_one(id).await?)
    }

    async fn get_by_email(&self, email: &str) -> LiftResult<User> {
        let mut result = self
            .db
            .query(format!(
                "SELECT {USER_PROJECTION} FROM user WHERE email = $email"
            ))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("email={email}"),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> LiftResult<User> {
        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.email_confirmed.is_some() {
            sets.push("email_confirmed = $email_confirmed");
        }
        if input.last_login_at.is_some() {
            sets.push("last_login_at = $last_login_at");
        }
        // UPDATE on a missing record is a silent no-op; surface it instead.
        let existing = self.fetch_one(id).await?;
        if sets.is_empty() {
            return Ok(existing);
        }

        let query = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role_to_string(role).to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(email_confirmed) = input.email_confirmed {
            builder = builder.bind(("email_confirmed", email_confirmed));
        }
        if let Some(last_login_at) = input.last_login_at {
            builder = builder.bind(("last_login_at", last_login_at));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("user", e))?;

        Ok(self.fetch_one(id).await?)
    }

    async fn list_active(&self) -> LiftResult<Vec<User>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT {USER_PROJECTION} FROM user WHERE is_active = true \
                 ORDER BY last_name ASC, first_name ASC"
            ))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}
