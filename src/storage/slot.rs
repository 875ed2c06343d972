use crate::core::{BranchType, TransType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique key of a barrier row.
///
/// `reason` is deliberately not part of the key: a compensating call that
/// claims a forward slot first makes that slot unavailable to the forward
/// call itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub global_id: String,
    pub branch_id: String,
    pub branch_type: BranchType,
}

impl SlotKey {
    pub fn new(global_id: impl Into<String>, branch_id: impl Into<String>, branch_type: BranchType) -> Self {
        Self {
            global_id: global_id.into(),
            branch_id: branch_id.into(),
            branch_type,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.global_id, self.branch_id, self.branch_type)
    }
}

/// A persisted barrier row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRow {
    pub trans_type: TransType,
    pub global_id: String,
    pub branch_id: String,
    /// The role slot this row occupies
    pub branch_type: BranchType,
    /// The branch type of the call that won the slot
    pub reason: BranchType,
    /// Serialized business result, filled once after a successful callback
    pub result: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl SlotRow {
    pub fn claimed(trans_type: TransType, key: &SlotKey, reason: BranchType) -> Self {
        let now = Utc::now();
        Self {
            trans_type,
            global_id: key.global_id.clone(),
            branch_id: key.branch_id.clone(),
            branch_type: key.branch_type,
            reason,
            result: None,
            create_time: now,
            update_time: now,
        }
    }
}

/// Result of a reason-filtered point lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A row with the requested key and reason exists; carries its result column.
    Found(Option<String>),
    /// No row with that key was claimed under the requested reason.
    NotFound,
}
