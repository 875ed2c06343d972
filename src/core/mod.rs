pub mod error;
pub mod types;

pub use error::{BarrierError, Result};
pub use types::{BranchType, TransType};
