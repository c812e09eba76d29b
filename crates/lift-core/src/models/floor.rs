//! Floor domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Floor {
    pub id: Uuid,
    /// Unique across the building.
    pub floor_number: i32,
    pub name: Option<String>,
    /// The only attribute that may change once a floor is referenced
    /// by access history.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Floor {
    /// Display label, e.g. `"1 (Lobby)"` or `"12"`.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({name})", self.floor_number),
            None => self.floor_number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFloor {
    pub floor_number: i32,
    pub name: Option<String>,
}
