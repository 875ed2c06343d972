use super::{BarrierError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol family a branch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransType {
    Tcc,
    Saga,
}

impl TransType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransType::Tcc => "tcc",
            TransType::Saga => "saga",
        }
    }
}

impl fmt::Display for TransType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransType {
    type Err = BarrierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcc" => Ok(TransType::Tcc),
            "saga" => Ok(TransType::Saga),
            other => Err(BarrierError::InvalidArgument(format!(
                "unknown trans_type '{}'",
                other
            ))),
        }
    }
}

/// Role of a single branch call.
///
/// Also used as the role slot of a barrier row: every call claims the slot
/// of its own branch type, and compensating calls additionally poison the
/// slot of their forward counterpart (see [`BranchType::origin`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchType {
    Try,
    Confirm,
    Cancel,
    Action,
    Compensate,
}

impl BranchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchType::Try => "try",
            BranchType::Confirm => "confirm",
            BranchType::Cancel => "cancel",
            BranchType::Action => "action",
            BranchType::Compensate => "compensate",
        }
    }

    /// The forward slot a compensating call must poison.
    ///
    /// `None` for every branch type that has nothing to guard against.
    pub fn origin(&self) -> Option<BranchType> {
        match self {
            BranchType::Cancel => Some(BranchType::Try),
            BranchType::Compensate => Some(BranchType::Action),
            BranchType::Try | BranchType::Confirm | BranchType::Action => None,
        }
    }

    pub fn is_compensation(&self) -> bool {
        self.origin().is_some()
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BranchType {
    type Err = BarrierError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "try" => Ok(BranchType::Try),
            "confirm" => Ok(BranchType::Confirm),
            "cancel" => Ok(BranchType::Cancel),
            "action" => Ok(BranchType::Action),
            "compensate" => Ok(BranchType::Compensate),
            other => Err(BarrierError::InvalidArgument(format!(
                "unknown branch_type '{}'",
                other
            ))),
        }
    }
}
