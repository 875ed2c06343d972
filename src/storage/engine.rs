use super::{Lookup, SlotKey};
use crate::core::{BranchType, Result, TransType};
use async_trait::async_trait;

/// Slot store trait - allows pluggable storage backends
///
/// Any backend works as long as a claim on a key is atomic with respect to
/// concurrent units of work: a relational table with a unique index on
/// `(gid, branch_id, branch_type)`, a compare-and-swap key-value store, or
/// [`MemorySlotStore`](super::MemorySlotStore).
#[async_trait]
pub trait SlotStore: Send + Sync {
    type Transaction: SlotTransaction;

    /// Open a new unit of work
    async fn begin(&self) -> Result<Self::Transaction>;
}

/// One open unit of work against a [`SlotStore`].
///
/// Barrier bookkeeping and the business callback's own writes go through the
/// same value, so they commit or roll back together.
#[async_trait]
pub trait SlotTransaction: Send {
    /// Insert a row for `key` unless one already exists.
    ///
    /// Returns the number of rows inserted: 1 if this call created the row,
    /// 0 if the key was already claimed. A duplicate is never an error.
    async fn claim(&mut self, trans_type: TransType, key: &SlotKey, reason: BranchType) -> Result<u64>;

    /// Point lookup filtered by the reason the row was claimed with.
    ///
    /// A row stored under a different reason is reported as `NotFound`.
    async fn lookup(&mut self, key: &SlotKey, reason: BranchType) -> Result<Lookup>;

    /// Attach a serialized result to an existing row
    async fn store_result(&mut self, key: &SlotKey, result: &str) -> Result<()>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;

    /// Claim that is skipped when there is no slot to claim.
    async fn claim_optional(
        &mut self,
        trans_type: TransType,
        key: Option<&SlotKey>,
        reason: BranchType,
    ) -> Result<u64> {
        match key {
            Some(key) => self.claim(trans_type, key, reason).await,
            None => Ok(0),
        }
    }
}
