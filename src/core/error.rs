use thiserror::Error;

#[derive(Error, Debug)]
pub enum BarrierError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Branch callback failed: {0}")]
    Callback(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BarrierError>;

impl<T> From<std::sync::PoisonError<T>> for BarrierError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Store(format!("slot table lock poisoned: {}", err))
    }
}
