// ============================================================================
// Unit-of-Work State Management
// ============================================================================
//
// Every barrier evaluation runs inside exactly one unit of work.
// Lifecycle: Active -> Committed | Aborted, never back.
//
// ============================================================================

use super::SlotChange;
use crate::core::{BarrierError, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global transaction ID counter
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Bookkeeping for one unit of work: its state plus the undo log of slot
/// changes it has written through to the shared table.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    changes: Vec<SlotChange>,
    start_time: std::time::Instant,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            changes: Vec::new(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Fails unless the unit is still active.
    pub fn ensure_active(&self) -> Result<()> {
        if !self.state.is_active() {
            return Err(BarrierError::Store(format!(
                "transaction {} is already {}",
                self.id, self.state
            )));
        }
        Ok(())
    }

    pub fn record_change(&mut self, change: SlotChange) -> Result<()> {
        self.ensure_active()?;
        self.changes.push(change);
        Ok(())
    }

    /// Marks the unit committed and hands back its changes so the owner
    /// can release them.
    pub fn commit(&mut self) -> Result<Vec<SlotChange>> {
        if !self.state.is_active() {
            return Err(BarrierError::Store(format!(
                "cannot commit: transaction {} is already {}",
                self.id, self.state
            )));
        }

        self.state = TransactionState::Committed;
        Ok(std::mem::take(&mut self.changes))
    }

    /// Marks the unit aborted and hands back its changes newest first, the
    /// order in which they must be undone.
    pub fn rollback(&mut self) -> Result<Vec<SlotChange>> {
        if !self.state.is_active() {
            return Err(BarrierError::Store(format!(
                "cannot rollback: transaction {} is already {}",
                self.id, self.state
            )));
        }

        self.state = TransactionState::Aborted;
        let mut changes = std::mem::take(&mut self.changes);
        changes.reverse();
        Ok(changes)
    }
}
