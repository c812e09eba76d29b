//! Visitor access domain model.
//!
//! A visitor access is one issued invitation: an opaque QR token that
//! unlocks a fixed set of floors during a time window.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LiftError;

/// Lifecycle status. Only ever moves Pending → Active → Expired.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccessStatus {
    Pending,
    Active,
    Expired,
}

impl AccessStatus {
    /// Status assigned at issuance.
    pub fn initial(now: DateTime<Utc>, start_time: DateTime<Utc>) -> Self {
        if now >= start_time {
            AccessStatus::Active
        } else {
            AccessStatus::Pending
        }
    }

    /// Status implied by the window alone.
    pub fn for_window(now: DateTime<Utc>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        if now >= end_time {
            AccessStatus::Expired
        } else if now >= start_time {
            AccessStatus::Active
        } else {
            AccessStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Pending => "Pending",
            AccessStatus::Active => "Active",
            AccessStatus::Expired => "Expired",
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status filter for listings. `All` (or no filter) returns every status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AccessStatus),
}

impl StatusFilter {
    pub fn status(&self) -> Option<AccessStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(*status),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = LiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "All" => Ok(StatusFilter::All),
            "Pending" => Ok(StatusFilter::Only(AccessStatus::Pending)),
            "Active" => Ok(StatusFilter::Only(AccessStatus::Active)),
            "Expired" => Ok(StatusFilter::Only(AccessStatus::Expired)),
            other => Err(LiftError::validation(format!(
                "unknown status filter: {other}"
            ))),
        }
    }
}

/// A floor unlocked by a visitor access.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitorAccessFloor {
    pub floor_id: Uuid,
    pub floor_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorAccess {
    pub id: Uuid,
    pub created_by: Uuid,
    pub visitor_name: String,
    pub qr_token: String,
    /// Key of the stored credential image.
    pub image_ref: String,
    /// PNG bytes of the QR code. Present on single-record reads and on
    /// creation, `None` in listings.
    pub credential_image: Option<Vec<u8>>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AccessStatus,
    pub created_at: DateTime<Utc>,
    pub first_used_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub use_count: u32,
    pub floors: Vec<VisitorAccessFloor>,
}

impl VisitorAccess {
    pub fn floor_ids(&self) -> Vec<Uuid> {
        self.floors.iter().map(|f| f.floor_id).collect()
    }

    pub fn unlocks(&self, floor_id: Uuid) -> bool {
        self.floors.iter().any(|f| f.floor_id == floor_id)
    }

    /// Status at `now`, combining the stored status with the window.
    ///
    /// An expired record stays expired; otherwise the window decides,
    /// so a sweep that has not run yet cannot admit a stale credential.
    pub fn effective_status(&self, now: DateTime<Utc>) -> AccessStatus {
        match self.status {
            AccessStatus::Expired => AccessStatus::Expired,
            _ => AccessStatus::for_window(now, self.start_time, self.end_time),
        }
    }
}

/// Storage input for a new visitor access. Built by the ledger after
/// validation; carries the minted token and rendered image.
#[derive(Debug, Clone)]
pub struct CreateVisitorAccess {
    pub created_by: Uuid,
    pub visitor_name: String,
    pub qr_token: String,
    pub credential_image: Vec<u8>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AccessStatus,
    pub floors: Vec<VisitorAccessFloor>,
}

/// One record moved by a status sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusTransition {
    pub visitor_access_id: Uuid,
    pub created_by: Uuid,
    pub visitor_name: String,
    pub status: AccessStatus,
}

/// Records moved by one sweep, per pass.
#[derive(Debug, Clone, Default)]
pub struct StatusTransitions {
    pub activated: Vec<StatusTransition>,
    pub expired: Vec<StatusTransition>,
}
