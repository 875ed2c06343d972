use crate::core::{BarrierError, BranchType, Result, TransType};
use crate::storage::SlotKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated identity of one branch call.
///
/// Construction is the only validation point: every constructor rejects
/// empty identifiers and unknown protocol names before any storage is
/// touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBranchContext")]
pub struct BranchContext {
    trans_type: TransType,
    #[serde(rename = "gid")]
    global_id: String,
    branch_id: String,
    branch_type: BranchType,
}

/// Wire shape before validation
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBranchContext {
    trans_type: String,
    gid: String,
    branch_id: String,
    branch_type: String,
}

impl TryFrom<RawBranchContext> for BranchContext {
    type Error = BarrierError;

    fn try_from(raw: RawBranchContext) -> Result<Self> {
        BranchContext::parse(&raw.trans_type, &raw.gid, &raw.branch_id, &raw.branch_type)
    }
}

impl BranchContext {
    pub fn new(
        trans_type: TransType,
        global_id: impl Into<String>,
        branch_id: impl Into<String>,
        branch_type: BranchType,
    ) -> Result<Self> {
        let global_id = global_id.into();
        let branch_id = branch_id.into();
        if global_id.is_empty() || branch_id.is_empty() {
            return Err(BarrierError::InvalidArgument(format!(
                "invalid trans info: trans_type={} gid={:?} branch_id={:?} branch_type={}",
                trans_type, global_id, branch_id, branch_type
            )));
        }

        Ok(Self {
            trans_type,
            global_id,
            branch_id,
            branch_type,
        })
    }

    /// Build a context from its four textual fields
    pub fn parse(trans_type: &str, global_id: &str, branch_id: &str, branch_type: &str) -> Result<Self> {
        if [trans_type, global_id, branch_id, branch_type]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(BarrierError::InvalidArgument(format!(
                "invalid trans info: trans_type={:?} gid={:?} branch_id={:?} branch_type={:?}",
                trans_type, global_id, branch_id, branch_type
            )));
        }

        Self::new(
            trans_type.parse()?,
            global_id,
            branch_id,
            branch_type.parse()?,
        )
    }

    /// Build a context from request query pairs
    ///
    /// Recognized names are `trans_type`, `gid`, `branch_id` and
    /// `branch_type`; anything else is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use subtx_barrier::{BranchContext, BranchType};
    ///
    /// let ctx = BranchContext::from_query([
    ///     ("trans_type", "tcc"),
    ///     ("gid", "g1"),
    ///     ("branch_id", "01"),
    ///     ("branch_type", "try"),
    /// ])
    /// .unwrap();
    /// assert_eq!(ctx.branch_type(), BranchType::Try);
    /// ```
    pub fn from_query<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = RawBranchContext::default();
        for (name, value) in pairs {
            let slot = match name.as_ref() {
                "trans_type" => &mut raw.trans_type,
                "gid" => &mut raw.gid,
                "branch_id" => &mut raw.branch_id,
                "branch_type" => &mut raw.branch_type,
                _ => continue,
            };
            *slot = value.as_ref().to_string();
        }
        Self::try_from(raw)
    }

    pub fn trans_type(&self) -> TransType {
        self.trans_type
    }

    pub fn global_id(&self) -> &str {
        &self.global_id
    }

    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    pub fn branch_type(&self) -> BranchType {
        self.branch_type
    }

    /// The slot this call claims for itself
    pub fn own_slot(&self) -> SlotKey {
        SlotKey::new(self.global_id.clone(), self.branch_id.clone(), self.branch_type)
    }

    /// The forward slot this call poisons, if it is a compensation
    pub fn origin_slot(&self) -> Option<SlotKey> {
        self.branch_type
            .origin()
            .map(|origin| SlotKey::new(self.global_id.clone(), self.branch_id.clone(), origin))
    }
}

impl fmt::Display for BranchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transInfo: {} {} {} {}",
            self.trans_type, self.global_id, self.branch_id, self.branch_type
        )
    }
}
