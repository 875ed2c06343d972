use super::{BarrierEngine, BarrierOutcome, BranchContext, BranchFuture};
use crate::core::Result;
use crate::storage::{SlotStore, SlotTransaction};
use futures::FutureExt;
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::panic::{AssertUnwindSafe, resume_unwind};

/// Runs a whole barrier evaluation inside one unit of work.
///
/// Commits when the evaluation produced an outcome (synthetic ones
/// included), rolls back on any error, and on a panic rolls back before
/// resuming the unwind. If the returned future is dropped midway, the unit
/// of work is dropped with it and must roll itself back.
pub struct BarrierExecutor<S> {
    store: S,
}

impl<S: SlotStore> BarrierExecutor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pass one branch call through the barrier.
    ///
    /// `busi` runs at most once per call, and only when the barrier allows
    /// it. It receives the same unit of work so its own writes commit or
    /// roll back together with the barrier bookkeeping.
    ///
    /// # Examples
    ///
    /// ```
    /// use subtx_barrier::{BarrierExecutor, BranchContext, Disposition, MemorySlotStore};
    /// use serde_json::{Value, json};
    ///
    /// # tokio_test::block_on(async {
    /// let executor = BarrierExecutor::new(MemorySlotStore::new());
    /// let cancel = BranchContext::parse("tcc", "g1", "01", "cancel").unwrap();
    ///
    /// // No try was ever seen, so the cancel succeeds without running.
    /// let outcome = executor
    ///     .run::<Value, _>(&cancel, |_tx| Box::pin(async { anyhow::Ok(json!("refunded")) }))
    ///     .await
    ///     .unwrap();
    /// assert_eq!(outcome.kind(), "null compensation");
    /// assert_eq!(outcome.disposition(), Some(Disposition::Success));
    /// # });
    /// ```
    pub async fn run<T, F>(&self, ctx: &BranchContext, busi: F) -> Result<BarrierOutcome<T>>
    where
        T: Serialize + DeserializeOwned + Send,
        F: for<'a> FnOnce(&'a mut S::Transaction) -> BranchFuture<'a, T> + Send,
    {
        let mut tx = self.store.begin().await?;

        let evaluated = AssertUnwindSafe(BarrierEngine::new(&mut tx).evaluate(ctx, busi))
            .catch_unwind()
            .await;

        match evaluated {
            Ok(Ok(outcome)) => {
                tx.commit().await?;
                debug!("{}: result is {}", ctx, outcome.kind());
                Ok(outcome)
            }
            Ok(Err(err)) => {
                warn!("{}: rolling back, error is {}", ctx, err);
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("{}: rollback failed: {}", ctx, rollback_err);
                }
                Err(err)
            }
            Err(panic) => {
                warn!("{}: rolling back after panic", ctx);
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("{}: rollback failed: {}", ctx, rollback_err);
                }
                resume_unwind(panic)
            }
        }
    }
}

impl<S: Clone> Clone for BarrierExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}
