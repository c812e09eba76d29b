//! First-run seeding: the building's floors and an initial admin.

use lift_core::error::LiftResult;
use lift_core::models::floor::CreateFloor;
use lift_core::models::user::{CreateUser, Role, UpdateUser};
use lift_core::repository::{FloorRepository, UserRepository};
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;
use crate::repository::{CountRow, SurrealFloorRepository, SurrealUserRepository};

/// Initial administrator account. The password arrives already hashed.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdmin {
    pub email: String,
    pub password_hash: String,
    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
    #[serde(default = "default_admin_last_name")]
    pub last_name: String,
}

fn default_admin_first_name() -> String {
    "Admin".into()
}

fn default_admin_last_name() -> String {
    "User".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Floors `1..=floor_count` are created on an empty database.
    pub floor_count: i32,
    /// Name given to floor 1.
    pub lobby_name: String,
    pub admin: Option<SeedAdmin>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            floor_count: 50,
            lobby_name: "Lobby".into(),
            admin: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub floors_created: u32,
    pub admin_created: bool,
}

async fn count(db: &Surreal<impl Connection>, query: &str) -> Result<u64, DbError> {
    let mut result = db.query(query).await?;
    let rows: Vec<CountRow> = result.take(0)?;
    Ok(rows.first().map(|r| r.total).unwrap_or(0))
}

/// Seed floors and the admin account when they are missing.
///
/// Safe to run on every startup: floors are only created when the
/// `floor` table is empty and the admin only when no admin exists.
pub async fn seed_defaults<C: Connection>(
    db: &Surreal<C>,
    config: &SeedConfig,
) -> LiftResult<SeedReport> {
    let mut report = SeedReport::default();

    if count(db, "SELECT count() AS total FROM floor GROUP ALL").await? == 0 {
        let floors = SurrealFloorRepository::new(db.clone());
        for floor_number in 1..=config.floor_count {
            let name = (floor_number == 1).then(|| config.lobby_name.clone());
            floors.create(CreateFloor { floor_number, name }).await?;
            report.floors_created += 1;
        }
        info!(count = report.floors_created, "Seeded floors");
    }

    if let Some(admin) = &config.admin {
        let admins = count(
            db,
            "SELECT count() AS total FROM user WHERE role = 'Admin' GROUP ALL",
        )
        .await?;
        if admins == 0 {
            let users = SurrealUserRepository::new(db.clone());
            let user = users
                .create(CreateUser {
                    email: admin.email.clone(),
                    first_name: admin.first_name.clone(),
                    last_name: admin.last_name.clone(),
                    password_hash: admin.password_hash.clone(),
                    role: Role::Admin,
                })
                .await?;
            users
                .update(
                    user.id,
                    UpdateUser {
                        email_confirmed: Some(true),
                        ..Default::default()
                    },
                )
                .await?;
            report.admin_created = true;
            info!(email = %admin.email, "Seeded admin account");
        }
    }

    Ok(report)
}
