//! Approval ledger: who has approved each in-flight target state
//!
//! The ledger belongs to one workflow instance. It has an entry per target
//! state that is collecting approvals, and each entry remembers the origin
//! state it was opened from. Entries opened from a state the instance has
//! since left are stale; the committer discards them before it evaluates
//! an attempt. The ledger never checks staleness on its own.

use crate::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of recording an approval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The approver was not yet in the entry and has been added
    Added,
    /// The approver had already approved this target; nothing changed
    AlreadyPresent,
}

/// Approvals collected toward one target state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    /// State the instance was in when the first approval arrived
    pub origin: String,
    /// Approver username -> the rule's roles that approver held at the time.
    /// Roles are captured here because identities are not cached and the
    /// quorum check needs the roles of earlier approvers.
    pub approvers: BTreeMap<String, BTreeSet<String>>,
    pub opened_at: DateTime<Utc>,
}

impl PendingApproval {
    fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            approvers: BTreeMap::new(),
            opened_at: Utc::now(),
        }
    }
}

/// Per-instance record of approvals, keyed by target state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalLedger {
    entries: BTreeMap<String, PendingApproval>,
}

impl ApprovalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity`'s approval of the move `origin -> target`,
    /// crediting it with `roles`. Recording the same username twice for
    /// the same target is a no-op that reports [`RecordOutcome::AlreadyPresent`].
    pub fn record(
        &mut self,
        origin: &str,
        target: &str,
        identity: &Identity,
        roles: BTreeSet<String>,
    ) -> RecordOutcome {
        let entry = self
            .entries
            .entry(target.to_owned())
            .or_insert_with(|| PendingApproval::new(origin));

        if entry.approvers.contains_key(&identity.username) {
            return RecordOutcome::AlreadyPresent;
        }
        entry.approvers.insert(identity.username.clone(), roles);
        RecordOutcome::Added
    }

    /// Usernames that have approved `target` (empty if none)
    pub fn approvers_of(&self, target: &str) -> BTreeSet<String> {
        self.entries
            .get(target)
            .map(|e| e.approvers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Union of the roles credited to the approvers of `target`
    pub fn roles_covered(&self, target: &str) -> BTreeSet<String> {
        self.entries
            .get(target)
            .map(|e| e.approvers.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, target: &str) -> Option<&PendingApproval> {
        self.entries.get(target)
    }

    /// Remove the entry for `target`
    pub fn clear(&mut self, target: &str) -> Option<PendingApproval> {
        self.entries.remove(target)
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry opened from a state other than `current_state`.
    /// Returns the targets that were dropped.
    pub fn discard_stale(&mut self, current_state: &str) -> Vec<String> {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.origin != current_state)
            .map(|(target, _)| target.clone())
            .collect();
        for target in &stale {
            self.entries.remove(target);
        }
        stale
    }

    /// Targets currently collecting approvals
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
