//! Lift DB: SurrealDB connection management, schema migrations, and
//! repository implementations for the `lift-core` traits.

mod connection;
mod error;
pub mod repository;
mod schema;
mod seed;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
pub use seed::{SeedAdmin, SeedConfig, SeedReport, seed_defaults};
