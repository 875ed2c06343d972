// ============================================================================
// Transaction Management Module
// ============================================================================
//
// Unit-of-work bookkeeping for the in-memory slot store:
// - State Pattern: Active -> Committed / Aborted
// - Command Pattern: reversible slot writes for rollback
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::SlotChange;
pub use state::{Transaction, TransactionId, TransactionState};
