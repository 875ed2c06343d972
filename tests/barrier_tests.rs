/// Barrier tests
///
/// Idempotency, null compensation, suspension and atomicity of single
/// branch calls.
/// Run with: cargo test --test barrier_tests

use futures::FutureExt;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use subtx_barrier::{
    BarrierError, BarrierExecutor, BarrierOutcome, BranchContext, BranchType, Disposition,
    MemorySlotStore, SlotKey, SyntheticOutcome,
};

fn new_gid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn tcc(gid: &str, branch_type: &str) -> BranchContext {
    BranchContext::parse("tcc", gid, "01", branch_type).unwrap()
}

fn saga(gid: &str, branch_type: &str) -> BranchContext {
    BranchContext::parse("saga", gid, "01", branch_type).unwrap()
}

/// Runs `ctx` through the barrier with a callback that counts its calls and
/// returns `value`.
async fn call(
    executor: &BarrierExecutor<MemorySlotStore>,
    ctx: &BranchContext,
    calls: &Arc<AtomicUsize>,
    value: Value,
) -> BarrierOutcome<Value> {
    let calls = Arc::clone(calls);
    executor
        .run(ctx, move |_tx| {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(value)
            })
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_idempotent_replay() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let gid = new_gid();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = call(&executor, &tcc(&gid, "try"), &calls, json!({"amount": 10})).await;
    assert_eq!(first, BarrierOutcome::Executed(json!({"amount": 10})));

    for _ in 0..5 {
        let again = call(&executor, &tcc(&gid, "try"), &calls, json!({"amount": 99})).await;
        assert_eq!(again, BarrierOutcome::Replayed(json!({"amount": 10})));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_try_then_cancel_runs_compensation() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let gid = new_gid();
    let calls = Arc::new(AtomicUsize::new(0));

    call(&executor, &tcc(&gid, "try"), &calls, json!({"amount": 10})).await;
    let replay = call(&executor, &tcc(&gid, "try"), &calls, json!(null)).await;
    assert_eq!(replay, BarrierOutcome::Replayed(json!({"amount": 10})));

    let cancel = call(&executor, &tcc(&gid, "cancel"), &calls, json!({"refunded": 10})).await;
    assert_eq!(cancel, BarrierOutcome::Executed(json!({"refunded": 10})));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let store = executor.store();
    let try_row = store.slot(&SlotKey::new(gid.as_str(), "01", BranchType::Try)).unwrap().unwrap();
    assert_eq!(try_row.reason, BranchType::Try);
    assert_eq!(try_row.result.as_deref(), Some("{\"amount\":10}"));

    let cancel_row = store.slot(&SlotKey::new(gid.as_str(), "01", BranchType::Cancel)).unwrap().unwrap();
    assert_eq!(cancel_row.reason, BranchType::Cancel);
    assert_eq!(cancel_row.result.as_deref(), Some("{\"refunded\":10}"));
}

#[tokio::test]
async fn test_null_compensation() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let gid = new_gid();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = call(&executor, &tcc(&gid, "cancel"), &calls, json!("undo")).await;
    assert_eq!(first, BarrierOutcome::Synthetic(SyntheticOutcome::NullCompensation));
    assert_eq!(first.disposition(), Some(Disposition::Success));

    let second = call(&executor, &tcc(&gid, "cancel"), &calls, json!("undo")).await;
    assert_eq!(second, BarrierOutcome::Synthetic(SyntheticOutcome::RepeatedNullCompensation));
    assert_eq!(second.disposition(), Some(Disposition::Success));

    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let poison = executor
        .store()
        .slot(&SlotKey::new(gid.as_str(), "01", BranchType::Try))
        .unwrap()
        .unwrap();
    assert_eq!(poison.reason, BranchType::Cancel);
    assert!(poison.result.is_none());
}

#[tokio::test]
async fn test_suspension_after_cancel() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let gid = new_gid();
    let calls = Arc::new(AtomicUsize::new(0));

    call(&executor, &tcc(&gid, "cancel"), &calls, json!("undo")).await;

    let late_try = call(&executor, &tcc(&gid, "try"), &calls, json!({"amount": 10})).await;
    assert_eq!(late_try, BarrierOutcome::Synthetic(SyntheticOutcome::Suspended));
    assert_eq!(late_try.into_json().unwrap(), json!({"dtm_result": "FAILURE"}));

    // Still suspended on retry.
    let retried = call(&executor, &tcc(&gid, "try"), &calls, json!({"amount": 10})).await;
    assert_eq!(retried, BarrierOutcome::Synthetic(SyntheticOutcome::Suspended));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_saga_compensate_before_action() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let gid = new_gid();
    let calls = Arc::new(AtomicUsize::new(0));

    let compensate = call(&executor, &saga(&gid, "compensate"), &calls, json!("undo")).await;
    assert_eq!(compensate.into_json().unwrap(), json!({"dtm_result": "SUCCESS"}));

    let action = call(&executor, &saga(&gid, "action"), &calls, json!("do")).await;
    assert_eq!(action, BarrierOutcome::Synthetic(SyntheticOutcome::Suspended));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_confirm_is_idempotent() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let gid = new_gid();
    let calls = Arc::new(AtomicUsize::new(0));

    call(&executor, &tcc(&gid, "try"), &calls, json!("frozen")).await;
    let confirm = call(&executor, &tcc(&gid, "confirm"), &calls, json!("paid")).await;
    assert_eq!(confirm, BarrierOutcome::Executed(json!("paid")));
    let again = call(&executor, &tcc(&gid, "confirm"), &calls, json!("paid twice")).await;
    assert_eq!(again, BarrierOutcome::Replayed(json!("paid")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_branches_are_independent() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let gid = new_gid();
    let calls = Arc::new(AtomicUsize::new(0));

    call(&executor, &tcc(&gid, "cancel"), &calls, json!("undo")).await;

    let other_branch = BranchContext::parse("tcc", &gid, "02", "try").unwrap();
    let outcome = call(&executor, &other_branch, &calls, json!(1)).await;
    assert_eq!(outcome, BarrierOutcome::Executed(json!(1)));
}

#[tokio::test]
async fn test_callback_error_allows_retry() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let ctx = tcc(&new_gid(), "try");

    let err = executor
        .run::<Value, _>(&ctx, |_tx| Box::pin(async { Err(anyhow::anyhow!("account locked")) }))
        .await
        .unwrap_err();
    match err {
        BarrierError::Callback(source) => assert_eq!(source.to_string(), "account locked"),
        other => panic!("unexpected error: {other}"),
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let retried = call(&executor, &ctx, &calls, json!({"amount": 10})).await;
    assert_eq!(retried, BarrierOutcome::Executed(json!({"amount": 10})));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[derive(Debug)]
struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("cannot encode result"))
    }
}

impl<'de> Deserialize<'de> for Unserializable {
    fn deserialize<D: serde::Deserializer<'de>>(_deserializer: D) -> Result<Self, D::Error> {
        Ok(Unserializable)
    }
}

#[tokio::test]
async fn test_serialization_failure_is_not_cached() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let ctx = tcc(&new_gid(), "try");
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let err = executor
        .run(&ctx, move |tx| {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.put_record("frozen", "alice", json!(10))?;
                anyhow::Ok(Unserializable)
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BarrierError::Serialization(_)));

    let store = executor.store();
    assert_eq!(store.slot_count().unwrap(), 0);
    assert!(store.record("frozen", "alice").unwrap().is_none());

    let retried = call(&executor, &ctx, &calls, json!({"amount": 10})).await;
    assert!(retried.is_executed());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

fn explode() -> Value {
    panic!("bug in business code")
}

#[tokio::test]
async fn test_panic_rolls_back_and_propagates() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let ctx = tcc(&new_gid(), "try");

    let result = AssertUnwindSafe(executor.run::<Value, _>(&ctx, |tx| {
        Box::pin(async move {
            tx.put_record("frozen", "alice", json!(10))?;
            anyhow::Ok(explode())
        })
    }))
    .catch_unwind()
    .await;

    let payload = result.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"bug in business code"));

    let store = executor.store();
    assert_eq!(store.slot_count().unwrap(), 0);
    assert!(store.record("frozen", "alice").unwrap().is_none());

    let calls = Arc::new(AtomicUsize::new(0));
    let retried = call(&executor, &ctx, &calls, json!("ok")).await;
    assert!(retried.is_executed());
}

#[tokio::test]
async fn test_business_writes_commit_with_barrier() {
    let executor = BarrierExecutor::new(MemorySlotStore::new());
    let ctx = tcc(&new_gid(), "try");

    for _ in 0..3 {
        executor
            .run(&ctx, |tx| {
                Box::pin(async move {
                    let frozen = tx
                        .record("frozen", "alice")?
                        .and_then(|v| v.as_i64())
                        .unwrap_or(0);
                    tx.put_record("frozen", "alice", json!(frozen + 10))?;
                    anyhow::Ok(json!({"frozen": frozen + 10}))
                })
            })
            .await
            .unwrap();
    }

    // Only the first call froze funds; retries replayed its result.
    assert_eq!(executor.store().record("frozen", "alice").unwrap(), Some(json!(10)));
}

#[tokio::test]
async fn test_invalid_context_fails_before_storage() {
    let err = BranchContext::from_query([("trans_type", "tcc"), ("gid", ""), ("branch_id", "01"), ("branch_type", "try")])
        .unwrap_err();
    assert!(matches!(err, BarrierError::InvalidArgument(_)));
}
