//! In-memory storage implementation

use super::traits::*;
use crate::definition_registry::DefinitionRegistry;
use async_trait::async_trait;
use formflow_types::{
    FormSubmission, FormTemplate, FormTemplateId, StorageError, StorageResult, SubmissionId,
    WorkflowDefinition, WorkflowDefinitionId, WorkflowInstance, WorkflowInstanceId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    templates: Arc<RwLock<HashMap<FormTemplateId, FormTemplate>>>,
    definitions: Arc<RwLock<DefinitionRegistry>>,
    submissions: Arc<RwLock<HashMap<SubmissionId, FormSubmission>>>,
    instances: Arc<RwLock<HashMap<WorkflowInstanceId, WorkflowInstance>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStorage for InMemoryStorage {
    async fn get_template(&self, id: &FormTemplateId) -> StorageResult<Option<FormTemplate>> {
        let templates = self.templates.read().await;
        Ok(templates.get(id).cloned())
    }

    async fn get_template_by_name(&self, name: &str) -> StorageResult<Option<FormTemplate>> {
        let templates = self.templates.read().await;
        Ok(templates.values().find(|t| t.name == name).cloned())
    }

    async fn list_templates(&self) -> StorageResult<Vec<FormTemplate>> {
        let templates = self.templates.read().await;
        let mut all: Vec<_> = templates.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn insert_template(&self, template: FormTemplate) -> StorageResult<()> {
        let mut templates = self.templates.write().await;

        if templates.contains_key(&template.id) {
            return Err(StorageError::Conflict(format!(
                "template {} already exists",
                template.id
            )));
        }
        if templates.values().any(|t| t.name == template.name) {
            return Err(StorageError::Conflict(format!(
                "template name '{}' is taken",
                template.name
            )));
        }

        templates.insert(template.id.clone(), template);
        Ok(())
    }

    async fn replace_template(&self, template: FormTemplate) -> StorageResult<()> {
        let mut templates = self.templates.write().await;

        if !templates.contains_key(&template.id) {
            return Err(StorageError::NotFound(format!("template {}", template.id)));
        }
        if templates
            .values()
            .any(|t| t.name == template.name && t.id != template.id)
        {
            return Err(StorageError::Conflict(format!(
                "template name '{}' is taken",
                template.name
            )));
        }

        templates.insert(template.id.clone(), template);
        Ok(())
    }
}

#[async_trait]
impl DefinitionStorage for InMemoryStorage {
    async fn get_definition(
        &self,
        id: &WorkflowDefinitionId,
    ) -> StorageResult<Option<WorkflowDefinition>> {
        let definitions = self.definitions.read().await;
        Ok(definitions.get(id).cloned())
    }

    async fn get_definition_for_template(
        &self,
        template: &FormTemplateId,
    ) -> StorageResult<Option<WorkflowDefinition>> {
        let definitions = self.definitions.read().await;
        Ok(definitions.get_for_template(template).cloned())
    }

    async fn list_definitions(&self) -> StorageResult<Vec<WorkflowDefinition>> {
        let definitions = self.definitions.read().await;
        Ok(definitions.list().into_iter().cloned().collect())
    }

    async fn insert_definition(&self, definition: WorkflowDefinition) -> StorageResult<()> {
        let mut definitions = self.definitions.write().await;
        definitions.register(definition).map(|_| ())
    }

    async fn replace_definition(&self, definition: WorkflowDefinition) -> StorageResult<()> {
        let mut definitions = self.definitions.write().await;
        definitions.replace(definition)
    }
}

#[async_trait]
impl SubmissionStorage for InMemoryStorage {
    async fn get_submission(&self, id: &SubmissionId) -> StorageResult<Option<FormSubmission>> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(id).cloned())
    }

    async fn list_submissions_by(&self, username: &str) -> StorageResult<Vec<FormSubmission>> {
        let submissions = self.submissions.read().await;
        let mut mine: Vec<_> = submissions
            .values()
            .filter(|s| s.submitted_by == username)
            .cloned()
            .collect();
        mine.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(mine)
    }

    async fn insert_submission(
        &self,
        submission: FormSubmission,
        instance: WorkflowInstance,
    ) -> StorageResult<()> {
        // Lock order: submissions, then instances.
        let mut submissions = self.submissions.write().await;
        let mut instances = self.instances.write().await;

        if submissions.contains_key(&submission.id) {
            return Err(StorageError::Conflict(format!(
                "submission {} already exists",
                submission.id
            )));
        }
        if instances.contains_key(&instance.id) {
            return Err(StorageError::Conflict(format!(
                "instance {} already exists",
                instance.id
            )));
        }

        submissions.insert(submission.id.clone(), submission);
        instances.insert(instance.id.clone(), instance);
        Ok(())
    }
}

#[async_trait]
impl InstanceStorage for InMemoryStorage {
    async fn get_instance(
        &self,
        id: &WorkflowInstanceId,
    ) -> StorageResult<Option<WorkflowInstance>> {
        let instances = self.instances.read().await;
        Ok(instances.get(id).cloned())
    }

    async fn get_instance_for_submission(
        &self,
        submission: &SubmissionId,
    ) -> StorageResult<Option<WorkflowInstance>> {
        let instances = self.instances.read().await;
        Ok(instances
            .values()
            .find(|i| &i.submission_id == submission)
            .cloned())
    }

    async fn list_instances(&self) -> StorageResult<Vec<WorkflowInstance>> {
        let instances = self.instances.read().await;
        let mut all: Vec<_> = instances.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn save_instance(
        &self,
        instance: WorkflowInstance,
        expected_revision: u64,
    ) -> StorageResult<()> {
        let mut instances = self.instances.write().await;
        let stored = instances
            .get_mut(&instance.id)
            .ok_or_else(|| StorageError::NotFound(format!("instance {}", instance.id)))?;

        if stored.revision != expected_revision {
            return Err(StorageError::Conflict(format!(
                "instance {} is at revision {}, expected {}",
                instance.id, stored.revision, expected_revision
            )));
        }
        *stored = instance;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_types::TransitionRule;
    use serde_json::Map;

    fn submission_pair() -> (FormSubmission, WorkflowInstance) {
        let submission = FormSubmission::new(FormTemplateId::new("t"), "alice", Map::new());
        let instance = WorkflowInstance::new(
            WorkflowDefinitionId::new("d"),
            submission.id.clone(),
            "Draft",
        );
        (submission, instance)
    }

    #[tokio::test]
    async fn test_template_roundtrip() {
        let storage = InMemoryStorage::new();
        let template = FormTemplate::new("Expense");
        let id = template.id.clone();
        storage.insert_template(template).await.unwrap();

        assert!(storage.get_template(&id).await.unwrap().is_some());
        assert!(storage
            .get_template_by_name("Expense")
            .await
            .unwrap()
            .is_some());
        assert_eq!(storage.list_templates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_template_rejects_taken_name() {
        let storage = InMemoryStorage::new();
        storage
            .insert_template(FormTemplate::new("Expense"))
            .await
            .unwrap();

        let result = storage.insert_template(FormTemplate::new("Expense")).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert_eq!(storage.list_templates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_template() {
        let storage = InMemoryStorage::new();
        let expense = FormTemplate::new("Expense");
        let id = expense.id.clone();
        storage.insert_template(expense).await.unwrap();
        storage
            .insert_template(FormTemplate::new("Leave"))
            .await
            .unwrap();

        let clash = FormTemplate::new("Leave").with_id(id.clone());
        let result = storage.replace_template(clash).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        let renamed = FormTemplate::new("Expenses").with_id(id.clone());
        storage.replace_template(renamed).await.unwrap();
        let stored = storage.get_template(&id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Expenses");

        let missing = storage.replace_template(FormTemplate::new("Other")).await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_definition_lookup_by_template() {
        let storage = InMemoryStorage::new();
        let def = WorkflowDefinition::new(FormTemplateId::new("t"), ["A", "B"])
            .with_transition(TransitionRule::any_of("A", "B", ["X"]));
        let id = def.id.clone();
        storage.insert_definition(def).await.unwrap();

        let found = storage
            .get_definition_for_template(&FormTemplateId::new("t"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
    }

    #[tokio::test]
    async fn test_submission_and_instance_stored_together() {
        let storage = InMemoryStorage::new();
        let (submission, instance) = submission_pair();
        let sub_id = submission.id.clone();
        storage.insert_submission(submission, instance).await.unwrap();

        let inst = storage
            .get_instance_for_submission(&sub_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inst.current_state, "Draft");
        assert_eq!(storage.list_submissions_by("alice").await.unwrap().len(), 1);
        assert!(storage.list_submissions_by("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_instance_checks_revision() {
        let storage = InMemoryStorage::new();
        let (submission, instance) = submission_pair();
        let id = instance.id.clone();
        storage.insert_submission(submission, instance).await.unwrap();

        let mut first = storage.get_instance(&id).await.unwrap().unwrap();
        let mut second = first.clone();

        first.current_state = "Review".into();
        first.touch();
        storage.save_instance(first, 0).await.unwrap();

        second.current_state = "Rejected".into();
        second.touch();
        let result = storage.save_instance(second, 0).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        let stored = storage.get_instance(&id).await.unwrap().unwrap();
        assert_eq!(stored.current_state, "Review");
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_save_unknown_instance() {
        let storage = InMemoryStorage::new();
        let (_, instance) = submission_pair();
        let result = storage.save_instance(instance, 0).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
