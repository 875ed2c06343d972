use std::time::Duration;

/// Barrier configuration
///
/// Similar to a connection config: a plain value with builder setters.
#[derive(Debug, Clone)]
pub struct BarrierConfig {
    /// Name of the slot table (shown in statement logs)
    pub table_name: String,

    /// How long a claim may wait on a slot held by another open unit of work.
    /// `None` waits until that unit finishes.
    pub lock_wait_timeout: Option<Duration>,
}

impl BarrierConfig {
    pub fn new() -> Self {
        Self {
            table_name: "dtm_barrier.barrier".to_string(),
            lock_wait_timeout: Some(Duration::from_secs(50)),
        }
    }

    /// Set the slot table name
    pub fn table_name(mut self, table_name: &str) -> Self {
        self.table_name = table_name.to_string();
        self
    }

    /// Set the lock wait timeout
    pub fn lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait_timeout = Some(timeout);
        self
    }

    /// Wait for slot owners indefinitely
    pub fn no_lock_wait_timeout(mut self) -> Self {
        self.lock_wait_timeout = None;
        self
    }
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self::new()
    }
}
