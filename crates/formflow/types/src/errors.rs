//! Error types for Formflow

use crate::{FormTemplateId, SubmissionId, WorkflowDefinitionId, WorkflowInstanceId};

/// Errors that can occur in workflow operations
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid transition: no rule from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Forbidden: '{username}' holds no role allowed for {from} -> {to}")]
    Forbidden {
        username: String,
        from: String,
        to: String,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Workflow definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Form template {0} already has a workflow definition")]
    DefinitionForTemplateExists(FormTemplateId),

    #[error("Form template not found: {0}")]
    TemplateNotFound(FormTemplateId),

    #[error("Form template name already in use: {0}")]
    DuplicateTemplateName(String),

    #[error("Workflow instance not found: {0}")]
    InstanceNotFound(WorkflowInstanceId),

    #[error("Submission not found: {0}")]
    SubmissionNotFound(SubmissionId),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("Workflow definition must have at least one state")]
    EmptyStates,

    #[error("Duplicate state: {0}")]
    DuplicateState(String),

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Duplicate transition: {from} -> {to}")]
    DuplicateTransition { from: String, to: String },

    #[error("Workflow validation error: {0}")]
    ValidationError(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl WorkflowError {
    pub fn definition_not_found(id: &WorkflowDefinitionId) -> Self {
        Self::DefinitionNotFound(id.to_string())
    }

    /// True for the rejections a transition attempt can produce without
    /// touching the instance: no rule, or no allowed role.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. } | Self::Forbidden { .. })
    }
}

/// Storage-specific errors, surfaced verbatim to the caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected because the stored revision moved underneath it
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
