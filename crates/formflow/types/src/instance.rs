//! Workflow instances: one submission's position in its state graph
//!
//! An instance is created at the definition's initial state the moment a
//! submission is accepted. Only the engine's committer changes
//! `current_state`; every persisted change bumps `revision` so stores can
//! detect lost updates.

use crate::{ApprovalLedger, SubmissionId, WorkflowDefinitionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Instance Identifier ──────────────────────────────────────────────

/// Unique identifier for a workflow instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowInstanceId(pub String);

impl WorkflowInstanceId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for WorkflowInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Workflow Instance ────────────────────────────────────────────────

/// A submission's live position in its workflow
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: WorkflowInstanceId,
    /// The definition this instance walks
    pub definition_id: WorkflowDefinitionId,
    /// The submission this instance routes
    pub submission_id: SubmissionId,
    /// Always the initial state or the `to_state` of a committed rule
    pub current_state: String,
    /// Approvals collected for in-flight transitions out of `current_state`
    #[serde(default)]
    pub pending_approvals: ApprovalLedger,
    /// Incremented on every mutation
    #[serde(default)]
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Create an instance sitting in `initial_state`
    pub fn new(
        definition_id: WorkflowDefinitionId,
        submission_id: SubmissionId,
        initial_state: impl Into<String>,
    ) -> Self {
        Self {
            id: WorkflowInstanceId::generate(),
            definition_id,
            submission_id,
            current_state: initial_state.into(),
            pending_approvals: ApprovalLedger::new(),
            revision: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: WorkflowInstanceId) -> Self {
        self.id = id;
        self
    }

    /// Mark a mutation: bump the revision and the timestamp
    pub fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = Utc::now();
    }

    pub fn is_in(&self, state: &str) -> bool {
        self.current_state == state
    }
}
