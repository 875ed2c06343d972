use super::{Lookup, SlotKey, SlotRow, SlotStore, SlotTransaction};
use crate::config::BarrierConfig;
use crate::core::{BarrierError, BranchType, Result, TransType};
use crate::transaction::{SlotChange, Transaction, TransactionId};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tokio::time::Instant;

type RecordKey = (String, String);

struct SlotEntry {
    row: SlotRow,
    /// Unit of work holding the row until it commits or rolls back
    owner: Option<TransactionId>,
    /// Last committed image of the row, `None` until its claim commits
    committed: Option<SlotRow>,
}

#[derive(Default)]
struct StoreState {
    slots: HashMap<SlotKey, SlotEntry>,
    records: HashMap<RecordKey, serde_json::Value>,
}

struct Shared {
    config: BarrierConfig,
    state: Mutex<StoreState>,
    /// Signalled whenever a unit of work releases its rows
    released: Notify,
}

/// In-memory slot table with unique-key claim semantics.
///
/// A claimed row belongs to its unit of work until that unit finishes. Other
/// units touching the same key wait for the release, the same way a unique
/// index behaves under row locking, and then see either the committed row or
/// a free key.
#[derive(Clone)]
pub struct MemorySlotStore {
    shared: Arc<Shared>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::with_config(BarrierConfig::default())
    }

    pub fn with_config(config: BarrierConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(StoreState::default()),
                released: Notify::new(),
            }),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.shared.config.table_name
    }

    /// Committed row for `key`, if any
    pub fn slot(&self, key: &SlotKey) -> Result<Option<SlotRow>> {
        let state = self.shared.state.lock()?;
        Ok(state
            .slots
            .get(key)
            .and_then(|entry| entry.committed.clone()))
    }

    /// Number of committed rows
    pub fn slot_count(&self) -> Result<usize> {
        let state = self.shared.state.lock()?;
        Ok(state
            .slots
            .values()
            .filter(|entry| entry.committed.is_some())
            .count())
    }

    /// Committed business record
    pub fn record(&self, table: &str, key: &str) -> Result<Option<serde_json::Value>> {
        let state = self.shared.state.lock()?;
        Ok(state
            .records
            .get(&(table.to_string(), key.to_string()))
            .cloned())
    }
}

impl Default for MemorySlotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let txn = Transaction::new(TransactionId::new());
        debug!("begin {} on {}", txn.id(), self.table_name());
        Ok(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            txn,
            staged_records: HashMap::new(),
        })
    }
}

/// A unit of work on a [`MemorySlotStore`].
///
/// Slot writes go through to the shared table immediately and are undone on
/// rollback. Business records are staged and only applied on commit.
/// Dropping an unfinished unit rolls it back.
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    txn: Transaction,
    staged_records: HashMap<RecordKey, serde_json::Value>,
}

impl MemoryTransaction {
    pub fn id(&self) -> TransactionId {
        self.txn.id()
    }

    /// Stage a business record write
    pub fn put_record(&mut self, table: &str, key: &str, value: serde_json::Value) -> Result<()> {
        self.txn.ensure_active()?;
        self.staged_records
            .insert((table.to_string(), key.to_string()), value);
        Ok(())
    }

    /// Read a business record, seeing this unit's own staged writes
    pub fn record(&self, table: &str, key: &str) -> Result<Option<serde_json::Value>> {
        self.txn.ensure_active()?;
        let record_key = (table.to_string(), key.to_string());
        if let Some(value) = self.staged_records.get(&record_key) {
            return Ok(Some(value.clone()));
        }
        let state = self.shared.state.lock()?;
        Ok(state.records.get(&record_key).cloned())
    }

    /// Run `op` against the table once no other open unit holds `key`.
    async fn with_slot<R, F>(&mut self, key: &SlotKey, mut op: F) -> Result<R>
    where
        R: Send,
        F: FnMut(&mut StoreState, TransactionId) -> Result<(R, Option<SlotChange>)> + Send,
    {
        self.txn.ensure_active()?;
        let id = self.txn.id();
        let shared = Arc::clone(&self.shared);
        let deadline = shared
            .config
            .lock_wait_timeout
            .map(|timeout| Instant::now() + timeout);

        loop {
            // Registered before inspecting the row so a release between the
            // check and the wait is not missed.
            let released = shared.released.notified();

            let attempt = {
                let mut state = shared.state.lock()?;
                let holder = state.slots.get(key).and_then(|entry| entry.owner);
                match holder {
                    Some(owner) if owner != id => Err(owner),
                    _ => Ok(op(&mut *state, id)?),
                }
            };

            match attempt {
                Ok((value, change)) => {
                    if let Some(change) = change {
                        self.txn.record_change(change)?;
                    }
                    return Ok(value);
                }
                Err(owner) => {
                    debug!("{} waiting on slot {} held by {}", id, key, owner);
                    match deadline {
                        Some(deadline) => tokio::time::timeout_at(deadline, released)
                            .await
                            .map_err(|_| {
                                BarrierError::Store(format!(
                                    "lock wait timeout exceeded on slot {} held by {}",
                                    key, owner
                                ))
                            })?,
                        None => released.await,
                    }
                }
            }
        }
    }

    fn finish_commit(&mut self) -> Result<()> {
        // Lock before the state flips: on a poisoned table the unit stays
        // active and is rolled back when dropped.
        let changes = {
            let mut state = self.shared.state.lock()?;
            let changes = self.txn.commit()?;
            for change in &changes {
                if let Some(entry) = state.slots.get_mut(change.key()) {
                    entry.owner = None;
                    entry.committed = Some(entry.row.clone());
                }
            }
            for (record_key, value) in self.staged_records.drain() {
                state.records.insert(record_key, value);
            }
            changes
        };
        self.shared.released.notify_waiters();
        debug!(
            "commit {}: released {} slot change(s) after {:?}",
            self.txn.id(),
            changes.len(),
            self.txn.duration()
        );
        Ok(())
    }

    fn finish_rollback(&mut self) -> Result<()> {
        let undo = self.txn.rollback()?;
        self.staged_records.clear();
        self.undo_changes(&undo);
        self.shared.released.notify_waiters();
        debug!("rollback {}: undid {} slot change(s)", self.txn.id(), undo.len());
        Ok(())
    }

    /// Reverses `undo` in order. Runs on a poisoned table too, so rows are
    /// never left owned by a finished unit.
    fn undo_changes(&self, undo: &[SlotChange]) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for change in undo {
            match change {
                SlotChange::Claimed { key } => {
                    state.slots.remove(key);
                }
                SlotChange::ResultStored {
                    key,
                    previous,
                    previous_update_time,
                } => {
                    if let Some(entry) = state.slots.get_mut(key) {
                        entry.row.result = previous.clone();
                        entry.row.update_time = *previous_update_time;
                        entry.owner = None;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl SlotTransaction for MemoryTransaction {
    async fn claim(&mut self, trans_type: TransType, key: &SlotKey, reason: BranchType) -> Result<u64> {
        debug!(
            "executing: insert ignore into {}(trans_type, gid, branch_id, branch_type, reason) values({}, {}, {}, {}, {})",
            self.shared.config.table_name, trans_type, key.global_id, key.branch_id, key.branch_type, reason
        );
        self.with_slot(key, |state, id| {
            if state.slots.contains_key(key) {
                return Ok((0, None));
            }
            state.slots.insert(
                key.clone(),
                SlotEntry {
                    row: SlotRow::claimed(trans_type, key, reason),
                    owner: Some(id),
                    committed: None,
                },
            );
            Ok((1, Some(SlotChange::Claimed { key: key.clone() })))
        })
        .await
    }

    async fn lookup(&mut self, key: &SlotKey, reason: BranchType) -> Result<Lookup> {
        debug!(
            "querying: select result from {} where gid={} and branch_id={} and branch_type={} and reason={}",
            self.shared.config.table_name, key.global_id, key.branch_id, key.branch_type, reason
        );
        self.with_slot(key, |state, _| {
            let found = match state.slots.get(key) {
                Some(entry) if entry.row.reason == reason => Lookup::Found(entry.row.result.clone()),
                _ => Lookup::NotFound,
            };
            Ok((found, None))
        })
        .await
    }

    async fn store_result(&mut self, key: &SlotKey, result: &str) -> Result<()> {
        debug!(
            "executing: update {} set result={} where gid={} and branch_id={} and branch_type={}",
            self.shared.config.table_name, result, key.global_id, key.branch_id, key.branch_type
        );
        self.with_slot(key, |state, id| {
            let entry = state.slots.get_mut(key).ok_or_else(|| {
                BarrierError::Store(format!("no barrier row for slot {}", key))
            })?;
            if entry.owner != Some(id) && entry.row.result.is_some() {
                return Err(BarrierError::Store(format!(
                    "result already stored for slot {}",
                    key
                )));
            }
            let previous = entry.row.result.replace(result.to_string());
            let previous_update_time = std::mem::replace(&mut entry.row.update_time, Utc::now());
            entry.owner = Some(id);
            Ok((
                (),
                Some(SlotChange::ResultStored {
                    key: key.clone(),
                    previous,
                    previous_update_time,
                }),
            ))
        })
        .await
    }

    async fn commit(mut self) -> Result<()> {
        self.finish_commit()
    }

    async fn rollback(mut self) -> Result<()> {
        self.finish_rollback()
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.txn.state().is_active() {
            warn!("{} dropped while active, rolling back", self.txn.id());
            if let Err(err) = self.finish_rollback() {
                warn!("rollback of dropped {} failed: {}", self.txn.id(), err);
            }
        }
    }
}
