// ============================================================================
// Sub-transaction Barrier
// ============================================================================
//
// Idempotency, anti-suspension and null compensation for TCC / Saga branch
// calls, decided from a handful of unique-keyed slot rows written in the
// same unit of work as the business change.
//
// ============================================================================

pub mod context;
pub mod engine;
pub mod executor;
pub mod outcome;

pub use context::BranchContext;
pub use engine::{BarrierEngine, BranchFuture};
pub use executor::BarrierExecutor;
pub use outcome::{BarrierOutcome, Disposition, SyntheticOutcome};
