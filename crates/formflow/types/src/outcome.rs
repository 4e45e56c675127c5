//! Results of a transition attempt that did not fail

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What happened to a legal, authorized transition attempt.
///
/// Rejections (no matching rule, missing role, storage failure) are
/// reported as [`crate::WorkflowError`] instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The instance moved to this state
    Committed(String),
    /// Approval recorded; quorum not yet met. Holds the approvers so far.
    Pending(BTreeSet<String>),
    /// This identity had already approved the target; nothing changed
    AlreadyApproved,
}

impl TransitionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    /// The new state, if the attempt committed
    pub fn committed_state(&self) -> Option<&str> {
        match self {
            Self::Committed(state) => Some(state),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Committed(state) => write!(f, "committed -> {}", state),
            Self::Pending(approvers) => {
                let names: Vec<&str> = approvers.iter().map(String::as_str).collect();
                write!(f, "pending (approved by {})", names.join(", "))
            }
            Self::AlreadyApproved => write!(f, "already approved"),
        }
    }
}
