//! Workflow definitions: the state graph bound to a form template
//!
//! A definition is a flat list of named states and point-to-point
//! transition rules. There are no parallel branches, timers or
//! sub-workflows. A state with no outgoing rule is terminal.

use crate::FormTemplateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a workflow definition
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowDefinitionId(pub String);

impl WorkflowDefinitionId {
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

impl std::fmt::Display for WorkflowDefinitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Quorum Mode ──────────────────────────────────────────────────────

/// How many approvals a transition needs before it commits.
///
/// Quorum mode only decides *when* a transition commits. Who may
/// contribute an approval is the same in both modes: anyone holding at
/// least one of the rule's allowed roles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuorumMode {
    /// A single authorized approval commits the transition
    #[default]
    #[serde(rename = "ANY", alias = "OR", alias = "any", alias = "or")]
    Any,
    /// Every distinct allowed role must be represented among approvers
    #[serde(rename = "ALL", alias = "AND", alias = "all", alias = "and")]
    All,
}

impl std::fmt::Display for QuorumMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "ANY"),
            Self::All => write!(f, "ALL"),
        }
    }
}

// ── Transition Rule ──────────────────────────────────────────────────

/// An edge in the state graph, gated by roles and a quorum mode
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// State the instance must currently be in
    pub from_state: String,
    /// State the instance moves to on commit
    pub to_state: String,
    /// Roles allowed to approve this transition (must be non-empty)
    pub allowed_roles: BTreeSet<String>,
    /// When the transition commits
    #[serde(default, alias = "logical_type")]
    pub quorum_mode: QuorumMode,
}

impl TransitionRule {
    /// Create a rule that commits on the first authorized approval
    pub fn any_of<I, R>(from: impl Into<String>, to: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            from_state: from.into(),
            to_state: to.into(),
            allowed_roles: roles.into_iter().map(Into::into).collect(),
            quorum_mode: QuorumMode::Any,
        }
    }

    /// Create a rule that commits once every allowed role has approved
    pub fn all_of<I, R>(from: impl Into<String>, to: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            quorum_mode: QuorumMode::All,
            ..Self::any_of(from, to, roles)
        }
    }

    /// True if this rule connects exactly `from` and `to`
    pub fn connects(&self, from: &str, to: &str) -> bool {
        self.from_state == from && self.to_state == to
    }
}

impl std::fmt::Display for TransitionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} [{}]",
            self.from_state, self.to_state, self.quorum_mode
        )
    }
}

// ── Workflow Definition ──────────────────────────────────────────────

/// The state graph attached to one form template
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique identifier
    pub id: WorkflowDefinitionId,
    /// The template whose submissions are routed through this workflow
    pub form_template: FormTemplateId,
    /// Ordered state names; the first is the initial state
    pub states: Vec<String>,
    /// Transition rules, in definition order
    #[serde(default)]
    pub transitions: Vec<TransitionRule>,
    /// When this definition was created
    pub created_at: DateTime<Utc>,
    /// When states or transitions were last replaced
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Create a definition with no transitions
    pub fn new<I, S>(form_template: FormTemplateId, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now();
        Self {
            id: WorkflowDefinitionId::generate(),
            form_template,
            states: states.into_iter().map(Into::into).collect(),
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: WorkflowDefinitionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_transition(mut self, rule: TransitionRule) -> Self {
        self.transitions.push(rule);
        self
    }

    /// Append a rule. Structural checks happen in the engine's validator.
    pub fn add_transition(&mut self, rule: TransitionRule) {
        self.transitions.push(rule);
        self.updated_at = Utc::now();
    }

    /// The state new instances start in
    pub fn initial_state(&self) -> Option<&str> {
        self.states.first().map(String::as_str)
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    /// Rules leaving `state`, in definition order
    pub fn outgoing(&self, state: &str) -> impl Iterator<Item = &TransitionRule> {
        let state = state.to_owned();
        self.transitions
            .iter()
            .filter(move |rule| rule.from_state == state)
    }

    /// A state with no outgoing rule is terminal
    pub fn is_terminal(&self, state: &str) -> bool {
        self.outgoing(state).next().is_none()
    }

    /// States that have no outgoing rules
    pub fn terminal_states(&self) -> Vec<&str> {
        self.states
            .iter()
            .map(String::as_str)
            .filter(|s| self.is_terminal(s))
            .collect()
    }
}
