//! Access log domain model (append-only).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccessMethod {
    Nfc,
    Fingerprint,
    Qr,
    AdminOverride,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccessOutcome {
    Successful,
    Denied,
}

/// Who attempted the access: a resident/admin or a visitor credential.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Accessor {
    User(Uuid),
    Visitor(Uuid),
}

impl Accessor {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Accessor::User(id) => Some(*id),
            Accessor::Visitor(_) => None,
        }
    }

    pub fn visitor_access_id(&self) -> Option<Uuid> {
        match self {
            Accessor::Visitor(id) => Some(*id),
            Accessor::User(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLog {
    pub id: Uuid,
    pub accessor: Accessor,
    pub floor_id: Uuid,
    pub method: AccessMethod,
    pub outcome: AccessOutcome,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccessLog {
    pub accessor: Accessor,
    pub floor_id: Uuid,
    pub method: AccessMethod,
    pub outcome: AccessOutcome,
    /// Defaults to the time of insertion.
    pub timestamp: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub ip_address: Option<String>,
}
