// ============================================================================
// Sub-transaction Barrier Library
// ============================================================================

//! Exactly-once branch execution for TCC and Saga participants.
//!
//! A branch call is passed through [`BarrierExecutor::run`] together with
//! its business callback. The barrier claims unique slot rows in the same
//! unit of work as the callback's writes and decides whether the callback
//! runs, a cached result is replayed, or a fixed disposition is returned:
//!
//! - retried calls replay the first successful result (idempotency);
//! - a compensation with no forward call succeeds without running
//!   (null compensation);
//! - a forward call arriving after its compensation fails without running
//!   (anti-suspension).
//!
//! # Examples
//!
//! ```
//! use subtx_barrier::{BarrierExecutor, BarrierOutcome, BranchContext, MemorySlotStore};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = BarrierExecutor::new(MemorySlotStore::new());
//! let try_ctx = BranchContext::parse("tcc", "g1", "01", "try")?;
//!
//! let outcome = executor
//!     .run(&try_ctx, |tx| {
//!         Box::pin(async move {
//!             tx.put_record("frozen", "alice", json!(10))?;
//!             anyhow::Ok(json!({"amount": 10}))
//!         })
//!     })
//!     .await?;
//! assert_eq!(outcome, BarrierOutcome::Executed(json!({"amount": 10})));
//!
//! // A retry replays the stored result without running the callback.
//! let retried = executor
//!     .run(&try_ctx, |_tx| Box::pin(async { anyhow::Ok(json!({"amount": 99})) }))
//!     .await?;
//! assert_eq!(retried, BarrierOutcome::Replayed(json!({"amount": 10})));
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod config;
pub mod core;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use barrier::{
    BarrierEngine, BarrierExecutor, BarrierOutcome, BranchContext, BranchFuture, Disposition,
    SyntheticOutcome,
};
pub use config::BarrierConfig;
pub use crate::core::{BarrierError, BranchType, Result, TransType};
pub use storage::{Lookup, MemorySlotStore, MemoryTransaction, SlotKey, SlotRow, SlotStore, SlotTransaction};
