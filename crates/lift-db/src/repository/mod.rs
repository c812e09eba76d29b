//! SurrealDB repository implementations.

mod access_log;
mod floor;
mod permission;
mod user;
mod visitor_access;

pub use access_log::SurrealAccessLogRepository;
pub use floor::SurrealFloorRepository;
pub use permission::SurrealFloorPermissionRepository;
pub use user::SurrealUserRepository;
pub use visitor_access::SurrealVisitorAccessRepository;

use surrealdb_types::SurrealValue;

/// Row struct for `count() ... GROUP ALL` queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}
