//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings and used as
//! record keys; enums are stored as strings guarded by ASSERT lists.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['Resident', 'Admin'];
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD email_confirmed ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Floors
-- =======================================================================
DEFINE TABLE floor SCHEMAFULL;
DEFINE FIELD floor_number ON TABLE floor TYPE int;
DEFINE FIELD name ON TABLE floor TYPE option<string>;
DEFINE FIELD is_active ON TABLE floor TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE floor TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_floor_number ON TABLE floor COLUMNS floor_number UNIQUE;

-- =======================================================================
-- Floor permissions (one row per user/floor, upserted)
-- =======================================================================
DEFINE TABLE floor_permission SCHEMAFULL;
DEFINE FIELD user_id ON TABLE floor_permission TYPE string;
DEFINE FIELD floor_id ON TABLE floor_permission TYPE string;
DEFINE FIELD is_allowed ON TABLE floor_permission TYPE bool;
DEFINE FIELD granted_by ON TABLE floor_permission TYPE option<string>;
DEFINE FIELD granted_at ON TABLE floor_permission TYPE datetime;
DEFINE FIELD notes ON TABLE floor_permission TYPE option<string>;
DEFINE INDEX idx_floor_permission_user_floor ON TABLE floor_permission \
    COLUMNS user_id, floor_id UNIQUE;

-- =======================================================================
-- Visitor access
-- =======================================================================
DEFINE TABLE visitor_access SCHEMAFULL;
DEFINE FIELD created_by ON TABLE visitor_access TYPE string;
DEFINE FIELD visitor_name ON TABLE visitor_access TYPE string;
DEFINE FIELD qr_token ON TABLE visitor_access TYPE string;
DEFINE FIELD image_ref ON TABLE visitor_access TYPE string;
DEFINE FIELD start_time ON TABLE visitor_access TYPE datetime;
DEFINE FIELD end_time ON TABLE visitor_access TYPE datetime;
DEFINE FIELD status ON TABLE visitor_access TYPE string \
    ASSERT $value IN ['Pending', 'Active', 'Expired'];
DEFINE FIELD created_at ON TABLE visitor_access TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD first_used_at ON TABLE visitor_access TYPE option<datetime>;
DEFINE FIELD last_used_at ON TABLE visitor_access TYPE option<datetime>;
DEFINE FIELD use_count ON TABLE visitor_access TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE INDEX idx_visitor_access_token ON TABLE visitor_access \
    COLUMNS qr_token UNIQUE;
DEFINE INDEX idx_visitor_access_creator ON TABLE visitor_access \
    COLUMNS created_by, created_at;
DEFINE INDEX idx_visitor_access_status ON TABLE visitor_access \
    COLUMNS status, start_time, end_time;

DEFINE TABLE visitor_access_floor SCHEMAFULL;
DEFINE FIELD visitor_access_id ON TABLE visitor_access_floor TYPE string;
DEFINE FIELD floor_id ON TABLE visitor_access_floor TYPE string;
DEFINE FIELD floor_number ON TABLE visitor_access_floor TYPE int;
DEFINE INDEX idx_visitor_access_floor ON TABLE visitor_access_floor \
    COLUMNS visitor_access_id, floor_id UNIQUE;

-- Rendered credential images, referenced by visitor_access.image_ref.
DEFINE TABLE credential_image SCHEMAFULL;
DEFINE FIELD content_type ON TABLE credential_image TYPE string;
DEFINE FIELD data ON TABLE credential_image TYPE string;
DEFINE FIELD created_at ON TABLE credential_image TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Access log (append-only)
-- =======================================================================
DEFINE TABLE access_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD user_id ON TABLE access_log TYPE option<string>;
DEFINE FIELD visitor_access_id ON TABLE access_log TYPE option<string>;
DEFINE FIELD floor_id ON TABLE access_log TYPE string;
DEFINE FIELD method ON TABLE access_log TYPE string \
    ASSERT $value IN ['Nfc', 'Fingerprint', 'Qr', 'AdminOverride'];
DEFINE FIELD outcome ON TABLE access_log TYPE string \
    ASSERT $value IN ['Successful', 'Denied'];
DEFINE FIELD timestamp ON TABLE access_log TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD reason ON TABLE access_log TYPE option<string>;
DEFINE FIELD ip_address ON TABLE access_log TYPE option<string>;
DEFINE INDEX idx_access_log_time ON TABLE access_log COLUMNS timestamp;
DEFINE INDEX idx_access_log_floor ON TABLE access_log \
    COLUMNS floor_id, timestamp;
DEFINE INDEX idx_access_log_user ON TABLE access_log \
    COLUMNS user_id, timestamp;
";

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
    {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
