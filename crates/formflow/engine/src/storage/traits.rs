//! Storage trait definitions

use async_trait::async_trait;
use formflow_types::{
    FormSubmission, FormTemplate, FormTemplateId, StorageResult, SubmissionId,
    WorkflowDefinition, WorkflowDefinitionId, WorkflowInstance, WorkflowInstanceId,
};

/// Combined storage trait
pub trait Storage:
    TemplateStorage + DefinitionStorage + SubmissionStorage + InstanceStorage + Send + Sync
{
}

impl<T> Storage for T where
    T: TemplateStorage + DefinitionStorage + SubmissionStorage + InstanceStorage + Send + Sync
{
}

/// Storage for form templates
#[async_trait]
pub trait TemplateStorage: Send + Sync {
    /// Get a template by ID
    async fn get_template(&self, id: &FormTemplateId) -> StorageResult<Option<FormTemplate>>;

    /// Get a template by its unique name
    async fn get_template_by_name(&self, name: &str) -> StorageResult<Option<FormTemplate>>;

    /// List all templates
    async fn list_templates(&self) -> StorageResult<Vec<FormTemplate>>;

    /// Store a new template. Conflicts if its id or its name is taken.
    async fn insert_template(&self, template: FormTemplate) -> StorageResult<()>;

    /// Overwrite an existing template. Conflicts if another template
    /// already carries the new name.
    async fn replace_template(&self, template: FormTemplate) -> StorageResult<()>;
}

/// Storage for workflow definitions
#[async_trait]
pub trait DefinitionStorage: Send + Sync {
    /// Get a definition by ID
    async fn get_definition(
        &self,
        id: &WorkflowDefinitionId,
    ) -> StorageResult<Option<WorkflowDefinition>>;

    /// Get the definition bound to a form template
    async fn get_definition_for_template(
        &self,
        template: &FormTemplateId,
    ) -> StorageResult<Option<WorkflowDefinition>>;

    /// List all definitions
    async fn list_definitions(&self) -> StorageResult<Vec<WorkflowDefinition>>;

    /// Store a new definition; conflicts if its template already has one
    async fn insert_definition(&self, definition: WorkflowDefinition) -> StorageResult<()>;

    /// Overwrite an existing definition
    async fn replace_definition(&self, definition: WorkflowDefinition) -> StorageResult<()>;
}

/// Storage for form submissions
#[async_trait]
pub trait SubmissionStorage: Send + Sync {
    /// Get a submission by ID
    async fn get_submission(&self, id: &SubmissionId) -> StorageResult<Option<FormSubmission>>;

    /// List submissions made by a user
    async fn list_submissions_by(&self, username: &str) -> StorageResult<Vec<FormSubmission>>;

    /// Store a submission together with its freshly created instance, as
    /// one write. Either both are stored or neither is.
    async fn insert_submission(
        &self,
        submission: FormSubmission,
        instance: WorkflowInstance,
    ) -> StorageResult<()>;
}

/// Storage for workflow instances
#[async_trait]
pub trait InstanceStorage: Send + Sync {
    /// Get an instance by ID
    async fn get_instance(&self, id: &WorkflowInstanceId)
        -> StorageResult<Option<WorkflowInstance>>;

    /// Get the instance routing a submission
    async fn get_instance_for_submission(
        &self,
        submission: &SubmissionId,
    ) -> StorageResult<Option<WorkflowInstance>>;

    /// List all instances
    async fn list_instances(&self) -> StorageResult<Vec<WorkflowInstance>>;

    /// Write back an instance loaded at `expected_revision`.
    ///
    /// Fails with `StorageError::Conflict` if the stored revision is no
    /// longer `expected_revision`, and with `NotFound` if the instance was
    /// never stored.
    async fn save_instance(
        &self,
        instance: WorkflowInstance,
        expected_revision: u64,
    ) -> StorageResult<()>;
}
