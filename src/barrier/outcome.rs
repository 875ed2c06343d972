use crate::core::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol-level answer returned instead of a business result.
///
/// Serializes as `{"dtm_result":"SUCCESS"}` or `{"dtm_result":"FAILURE"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dtm_result", rename_all = "UPPERCASE")]
pub enum Disposition {
    Success,
    Failure,
}

/// Why the barrier answered without running the business callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticOutcome {
    /// A compensation arrived before any forward call: nothing to undo.
    NullCompensation,
    /// A retried compensation whose first attempt was a null compensation.
    RepeatedNullCompensation,
    /// A forward call arrived after its compensation closed the branch.
    Suspended,
}

impl SyntheticOutcome {
    pub fn disposition(&self) -> Disposition {
        match self {
            SyntheticOutcome::NullCompensation | SyntheticOutcome::RepeatedNullCompensation => {
                Disposition::Success
            }
            SyntheticOutcome::Suspended => Disposition::Failure,
        }
    }
}

impl fmt::Display for SyntheticOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntheticOutcome::NullCompensation => write!(f, "null compensation"),
            SyntheticOutcome::RepeatedNullCompensation => write!(f, "repeated null compensation"),
            SyntheticOutcome::Suspended => write!(f, "suspended"),
        }
    }
}

/// What a barrier call produced
#[derive(Debug, Clone, PartialEq)]
pub enum BarrierOutcome<T> {
    /// The callback ran in this call and its result was cached.
    Executed(T),
    /// A previous call already completed; this is its cached result.
    Replayed(T),
    /// The callback was skipped for protocol reasons.
    Synthetic(SyntheticOutcome),
}

impl<T> BarrierOutcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            BarrierOutcome::Executed(value) | BarrierOutcome::Replayed(value) => Some(value),
            BarrierOutcome::Synthetic(_) => None,
        }
    }

    pub fn into_inner(self) -> Option<T> {
        match self {
            BarrierOutcome::Executed(value) | BarrierOutcome::Replayed(value) => Some(value),
            BarrierOutcome::Synthetic(_) => None,
        }
    }

    pub fn disposition(&self) -> Option<Disposition> {
        match self {
            BarrierOutcome::Synthetic(synthetic) => Some(synthetic.disposition()),
            _ => None,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, BarrierOutcome::Executed(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BarrierOutcome::Executed(_) => "executed",
            BarrierOutcome::Replayed(_) => "replayed",
            BarrierOutcome::Synthetic(SyntheticOutcome::NullCompensation) => "null compensation",
            BarrierOutcome::Synthetic(SyntheticOutcome::RepeatedNullCompensation) => {
                "repeated null compensation"
            }
            BarrierOutcome::Synthetic(SyntheticOutcome::Suspended) => "suspended",
        }
    }
}

impl<T: Serialize> BarrierOutcome<T> {
    /// Response body for the coordinator: the business value, or the
    /// disposition object for synthetic outcomes.
    pub fn into_json(self) -> Result<serde_json::Value> {
        let body = match self {
            BarrierOutcome::Executed(value) | BarrierOutcome::Replayed(value) => {
                serde_json::to_value(value)?
            }
            BarrierOutcome::Synthetic(synthetic) => serde_json::to_value(synthetic.disposition())?,
        };
        Ok(body)
    }
}
