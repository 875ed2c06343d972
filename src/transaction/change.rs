// ============================================================================
// Slot Change Tracking
// ============================================================================
//
// Slot writes go straight into the shared table so that concurrent claimers
// see the key as taken. Each write is recorded here so rollback can reverse
// it.
//
// ============================================================================

use crate::storage::SlotKey;
use chrono::{DateTime, Utc};

/// A single reversible write against the slot table
#[derive(Debug, Clone)]
pub enum SlotChange {
    /// A new slot row was inserted
    Claimed { key: SlotKey },

    /// The result column of an existing row was overwritten
    ResultStored {
        key: SlotKey,
        previous: Option<String>,
        previous_update_time: DateTime<Utc>,
    },
}

impl SlotChange {
    pub fn key(&self) -> &SlotKey {
        match self {
            SlotChange::Claimed { key } => key,
            SlotChange::ResultStored { key, .. } => key,
        }
    }
}
