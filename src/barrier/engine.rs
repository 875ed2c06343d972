// ============================================================================
// Barrier Decision Algorithm
// ============================================================================
//
// 1. A compensation (cancel / compensate) first claims the slot of its
//    forward counterpart (try / action) under its own branch type.
// 2. Every call claims its own slot.
// 3. Decide:
//    - compensation that won the forward slot   -> null compensation
//    - own slot already taken, reason mismatch  -> suspended
//    - own slot already taken, no result        -> repeated null compensation
//    - own slot already taken, result present   -> replay cached result
//    - otherwise run the callback and cache its result
//
// ============================================================================

use super::{BarrierOutcome, BranchContext, SyntheticOutcome};
use crate::core::{BarrierError, Result};
use crate::storage::{Lookup, SlotTransaction};
use futures::future::BoxFuture;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Future returned by a business callback. It borrows the unit of work.
pub type BranchFuture<'a, T> = BoxFuture<'a, anyhow::Result<T>>;

/// Evaluates one branch call against an open unit of work.
///
/// The engine never commits or rolls back; that belongs to
/// [`BarrierExecutor`](super::BarrierExecutor).
pub struct BarrierEngine<'t, Tx> {
    tx: &'t mut Tx,
}

impl<'t, Tx: SlotTransaction> BarrierEngine<'t, Tx> {
    pub fn new(tx: &'t mut Tx) -> Self {
        Self { tx }
    }

    pub async fn evaluate<T, F>(self, ctx: &BranchContext, busi: F) -> Result<BarrierOutcome<T>>
    where
        T: Serialize + DeserializeOwned + Send,
        F: for<'a> FnOnce(&'a mut Tx) -> BranchFuture<'a, T> + Send,
    {
        let branch_type = ctx.branch_type();
        let own_slot = ctx.own_slot();

        let origin_affected = self
            .tx
            .claim_optional(ctx.trans_type(), ctx.origin_slot().as_ref(), branch_type)
            .await?;
        let current_affected = self
            .tx
            .claim(ctx.trans_type(), &own_slot, branch_type)
            .await?;
        debug!(
            "{}: originAffected: {} currentAffected: {}",
            ctx, origin_affected, current_affected
        );

        if branch_type.is_compensation() && origin_affected > 0 {
            return Ok(BarrierOutcome::Synthetic(SyntheticOutcome::NullCompensation));
        }

        if current_affected == 0 {
            let outcome = match self.tx.lookup(&own_slot, branch_type).await? {
                Lookup::NotFound => BarrierOutcome::Synthetic(SyntheticOutcome::Suspended),
                Lookup::Found(None) => {
                    BarrierOutcome::Synthetic(SyntheticOutcome::RepeatedNullCompensation)
                }
                Lookup::Found(Some(cached)) => BarrierOutcome::Replayed(serde_json::from_str(&cached)?),
            };
            return Ok(outcome);
        }

        let value = busi(&mut *self.tx).await.map_err(BarrierError::Callback)?;
        let serialized = serde_json::to_string(&value)?;
        self.tx.store_result(&own_slot, &serialized).await?;

        Ok(BarrierOutcome::Executed(value))
    }
}
