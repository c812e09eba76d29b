//! Lift Access: floor permissions, visitor credentials, status sweeps,
//! access decisions and the append-only access log.

pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod events;
pub mod gate;
pub mod ledger;
pub mod logger;
pub mod password;
pub mod permission;
pub mod sweeper;

pub use auth::{AuthService, RegisterResident};
pub use config::AccessConfig;
pub use error::AccessError;
pub use events::{AccessEvent, BroadcastPublisher, EventPublisher, NoopPublisher};
pub use gate::{AccessDecision, AccessGate};
pub use ledger::{CreateVisitorAccessRequest, VisitorAccessService};
pub use logger::AccessLogService;
pub use password::{Argon2Verifier, CredentialVerifier};
pub use permission::PermissionService;
pub use sweeper::{StatusSweeper, SweepReport};
